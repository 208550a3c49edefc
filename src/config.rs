//! Configuration for appdeploy.
//!
//! Read from the process environment. `main` loads an optional `.env` file
//! first via dotenvy, so values there behave like exported variables.

use std::collections::HashMap;
use std::path::PathBuf;

/// Default AppRun release used for the launcher and its preload hooks.
pub const DEFAULT_APPRUN_VERSION: &str = "v2.0.0";

/// Deployer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Architecture of the bundled application (AppRun downloads).
    pub target_arch: String,
    /// Architecture of the machine running appimagetool.
    pub host_arch: String,
    /// AppRun release tag.
    pub apprun_version: String,
    /// Explicit `ldconfig` binary; searched for when unset.
    pub ldconfig: Option<PathBuf>,
    /// Program used to rewrite the ELF interpreter.
    pub patchelf: PathBuf,
    /// `LD_LIBRARY_PATH` entries, empty entries dropped.
    pub ld_library_path: Vec<PathBuf>,
    /// Qt install hints: `QTDIR`, `QT_ROOT_DIR`, `QT_PLUGIN_PATH`.
    pub qt_dir: Option<PathBuf>,
    pub qt_root_dir: Option<PathBuf>,
    pub qt_plugin_path: Option<PathBuf>,
    /// Running under GitHub Actions; enables `::group::` log markers.
    pub ci: bool,
    /// Where downloaded helper binaries are kept between runs.
    pub cache_dir: PathBuf,
}

impl Config {
    /// Load from the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit `KEY=value` pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let non_empty = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        let path = |key: &str| non_empty(key).map(PathBuf::from);

        let arch = std::env::consts::ARCH.to_string();

        let ld_library_path = vars
            .get("LD_LIBRARY_PATH")
            .map(|v| {
                v.split(':')
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        let cache_dir = path("APPDEPLOY_CACHE_DIR").unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("appdeploy")
        });

        Self {
            target_arch: non_empty("APPDEPLOY_TARGET_ARCH").unwrap_or_else(|| arch.clone()),
            host_arch: non_empty("APPDEPLOY_HOST_ARCH").unwrap_or(arch),
            apprun_version: non_empty("APPRUN_VERSION")
                .unwrap_or_else(|| DEFAULT_APPRUN_VERSION.to_string()),
            ldconfig: path("LDCONFIG"),
            patchelf: path("PATCHELF").unwrap_or_else(|| PathBuf::from("patchelf")),
            ld_library_path,
            qt_dir: path("QTDIR"),
            qt_root_dir: path("QT_ROOT_DIR"),
            qt_plugin_path: path("QT_PLUGIN_PATH"),
            ci: vars.contains_key("GITHUB_ACTIONS"),
            cache_dir,
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        let opt = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        };
        let ld_library_path = self
            .ld_library_path
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");

        println!("Configuration:");
        println!("  APPDEPLOY_TARGET_ARCH: {}", self.target_arch);
        println!("  APPDEPLOY_HOST_ARCH: {}", self.host_arch);
        println!("  APPRUN_VERSION: {}", self.apprun_version);
        println!("  APPDEPLOY_CACHE_DIR: {}", self.cache_dir.display());
        println!("  LDCONFIG: {}", opt(&self.ldconfig));
        println!("  PATCHELF: {}", self.patchelf.display());
        println!("  LD_LIBRARY_PATH: {}", ld_library_path);
        println!("  QTDIR: {}", opt(&self.qt_dir));
        println!("  QT_ROOT_DIR: {}", opt(&self.qt_root_dir));
        println!("  QT_PLUGIN_PATH: {}", opt(&self.qt_plugin_path));
        println!("  CI grouping: {}", if self.ci { "on" } else { "off" });
    }
}
