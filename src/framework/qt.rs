//! Qt plugin deployment.
//!
//! Qt loads its platform integration, image formats, SQL drivers and so on
//! from `<qt_dir>/plugins` at runtime. Once QtCore shows up in the resolved
//! set, the plugin directories matching the Qt modules in use are resolved
//! too, and the Qt tree is registered in the compat mapping so the plugins
//! land in `lib/<rel>/plugins` next to the Qt libraries.

use anyhow::Result;
use path_clean::PathClean;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use super::FrameworkExtension;
use crate::bundle::{AppRunEnv, LibCompatMapping};
use crate::config::Config;
use crate::resolve::{canonical_path, DependencyResolver};

static QT_CORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^libQt(\d*)Core\.so(?:\.(\d+))?").expect("static regex"));

/// Plugin directories pulled in when a Qt module is linked.
struct PluginGroup {
    pattern: Regex,
    found: &'static str,
    dirs: &'static [&'static str],
}

fn group(pattern: &str, found: &'static str, dirs: &'static [&'static str]) -> PluginGroup {
    PluginGroup {
        pattern: Regex::new(&format!("^(?:{})", pattern)).expect("static regex"),
        found,
        dirs,
    }
}

static PLUGIN_GROUPS: LazyLock<Vec<PluginGroup>> = LazyLock::new(|| {
    vec![
        group(
            r"libQt(\d*)Gui\.so(?:\.(\d+))?",
            "Qt GUI",
            &["iconengines", "imageformats", "platforminputcontexts"],
        ),
        group(
            r"libQt(\d*)(?:Gui|OpenGL|XcbQpa)\.so(?:\.(\d+))?|libxcb-glx\.so",
            "Qt GUI/OpenGL/XcbQpa",
            &["xcbglintegrations"],
        ),
        group(
            r"libQt(\d*)PrintSupport\.so(?:\.(\d+))?",
            "Qt PrintSupport",
            &["printsupport"],
        ),
        group(r"libQt(\d*)Network\.so(?:\.(\d+))?", "Qt Network", &["bearer"]),
        group(r"libQt(\d*)Sql\.so(?:\.(\d+))?", "Qt SQL", &["sqldrivers"]),
        group(
            r"libQt(\d*)Positioning\.so(?:\.(\d+))?",
            "Qt Positioning",
            &["position"],
        ),
        group(
            r"libQt(\d*)Multimedia\.so(?:\.(\d+))?",
            "Qt Multimedia",
            &["mediaservice", "audio"],
        ),
    ]
});

/// Qt plugin collaborator.
#[derive(Debug, Clone, Default)]
pub struct QtPlugins {
    /// Qt install roots tried after the ones derived from QtCore's location.
    extra_qt_dirs: Vec<PathBuf>,
}

impl QtPlugins {
    pub fn new(extra_qt_dirs: Vec<PathBuf>) -> Self {
        Self { extra_qt_dirs }
    }

    /// Hints from `QTDIR`, `QT_ROOT_DIR` and `QT_PLUGIN_PATH/..`.
    pub fn from_config(config: &Config) -> Self {
        let mut extra = Vec::new();
        extra.extend(config.qt_dir.clone());
        extra.extend(config.qt_root_dir.clone());
        extra.extend(config.qt_plugin_path.as_ref().map(|p| p.join("..")));
        Self::new(extra)
    }

    /// Qt install root: the first candidate holding a `plugins` directory.
    pub fn find_qt_dir(&self, lib_qt_core: &Path, qt_version: &str) -> Option<PathBuf> {
        let lib_dir = lib_qt_core.parent()?;
        let mut candidates = vec![
            lib_dir.join(format!("Qt{}", qt_version)),
            lib_dir.join(format!("qt{}", qt_version)),
            lib_dir.join(".."),
            lib_dir.join("..").join(format!("Qt{}", qt_version)),
            lib_dir.join("..").join(format!("qt{}", qt_version)),
        ];
        candidates.extend(self.extra_qt_dirs.iter().cloned());

        candidates
            .into_iter()
            .find(|dir| dir.join("plugins").exists())
            .and_then(|dir| canonical_path(&dir).ok())
    }
}

/// QtCore among `deps`, with the Qt major version taken from its name.
pub fn find_qt_core(deps: &BTreeSet<PathBuf>) -> Option<(PathBuf, String)> {
    deps.iter().find_map(|dep| {
        let name = dep.file_name()?.to_string_lossy();
        let caps = QT_CORE.captures(&name)?;
        let version = caps
            .get(1)
            .filter(|m| !m.as_str().is_empty())
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Some((dep.clone(), version))
    })
}

fn links_module(deps: &BTreeSet<PathBuf>, pattern: &Regex) -> bool {
    deps.iter().any(|dep| {
        dep.file_name()
            .map(|n| pattern.is_match(&n.to_string_lossy()))
            .unwrap_or(false)
    })
}

/// Lexical relative path from `base` to `path`. Both must be absolute and
/// clean.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for c in &path[common..] {
        rel.push(c.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Prefix of the Qt tree under `lib/`: its location relative to QtCore's
/// directory, or its own name when that would climb out of the bundle.
fn compat_qt_dir(qt_dir: &Path, lib_dir: &Path) -> PathBuf {
    let rel = relative_path(qt_dir, lib_dir);
    if !Path::new("lib").join(&rel).clean().starts_with("..") {
        return rel;
    }
    let fallback = qt_dir
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("qt"));
    println!(
        "  [WARN] Qt dir {} is not next to {}, deploying it to lib/{}",
        qt_dir.display(),
        lib_dir.display(),
        fallback.display()
    );
    fallback
}

impl FrameworkExtension for QtPlugins {
    fn name(&self) -> &str {
        "Qt"
    }

    fn deploy(
        &self,
        resolver: &mut DependencyResolver,
        env: &mut AppRunEnv,
        mapping: &mut LibCompatMapping,
    ) -> Result<bool> {
        let Some((lib_qt_core, qt_version)) = find_qt_core(resolver.dependencies()) else {
            println!("Qt Core library not found, skipping deploying Qt");
            return Ok(false);
        };
        println!("Found Qt Core: {}, adding Qt plugins", lib_qt_core.display());

        let Some(qt_dir) = self.find_qt_dir(&lib_qt_core, &qt_version) else {
            println!("Qt dir not found, skipping deploying Qt");
            return Ok(false);
        };
        println!("Found Qt dir: {}", qt_dir.display());

        let lib_dir = lib_qt_core.parent().unwrap_or(Path::new("/"));
        let compat_qt_dir = compat_qt_dir(&qt_dir, lib_dir);
        env.set(
            "QT_PLUGIN_PATH",
            format!("$APPDIR/lib/{}/plugins", compat_qt_dir.display()),
        );
        mapping.insert(qt_dir.clone(), compat_qt_dir);

        let plugins = qt_dir.join("plugins");
        let qxcb = plugins.join("platforms/libqxcb.so");
        if qxcb.exists() {
            resolver.resolve(&qxcb)?;
        } else {
            println!("  [WARN] {} not found", qxcb.display());
        }

        for group in PLUGIN_GROUPS.iter() {
            if !links_module(resolver.dependencies(), &group.pattern) {
                continue;
            }
            println!("Found {}, adding {}", group.found, group.dirs.join(", "));
            for dir in group.dirs {
                resolver.resolve_lib_dir(&plugins.join(dir))?;
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_find_qt_core_version() {
        let deps = set(&["/usr/lib/libc.so.6", "/usr/lib/libQt5Core.so.5"]);
        let (core, version) = find_qt_core(&deps).unwrap();
        assert_eq!(core, PathBuf::from("/usr/lib/libQt5Core.so.5"));
        assert_eq!(version, "5");

        let deps = set(&["/opt/qt/lib/libQtCore.so.4"]);
        assert_eq!(find_qt_core(&deps).unwrap().1, "4");

        assert!(find_qt_core(&set(&["/usr/lib/libssl.so.3"])).is_none());
    }

    #[test]
    fn test_module_patterns() {
        let deps = set(&["/usr/lib/libQt6Gui.so.6", "/usr/lib/libQt6Network.so.6"]);
        let matched: Vec<_> = PLUGIN_GROUPS
            .iter()
            .filter(|g| links_module(&deps, &g.pattern))
            .map(|g| g.found)
            .collect();
        assert_eq!(matched, vec!["Qt GUI", "Qt GUI/OpenGL/XcbQpa", "Qt Network"]);

        let glx = set(&["/usr/lib/libxcb-glx.so.0"]);
        assert!(links_module(&glx, &PLUGIN_GROUPS[1].pattern));
        assert!(!links_module(&glx, &PLUGIN_GROUPS[0].pattern));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/opt/Qt/5.15.2/gcc_64"), Path::new("/opt/Qt/5.15.2/gcc_64/lib")),
            PathBuf::from("..")
        );
        assert_eq!(
            relative_path(
                Path::new("/usr/lib/x86_64-linux-gnu/qt5"),
                Path::new("/usr/lib/x86_64-linux-gnu")
            ),
            PathBuf::from("qt5")
        );
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b")), PathBuf::from("."));
        assert_eq!(relative_path(Path::new("/a/x"), Path::new("/a/b/c")), PathBuf::from("../../x"));
    }

    #[test]
    fn test_compat_qt_dir_stays_in_bundle() {
        assert_eq!(
            compat_qt_dir(Path::new("/opt/Qt/5.15.2/gcc_64"), Path::new("/opt/Qt/5.15.2/gcc_64/lib")),
            PathBuf::from("..")
        );
        assert_eq!(
            compat_qt_dir(
                Path::new("/usr/lib/x86_64-linux-gnu/qt5"),
                Path::new("/usr/lib/x86_64-linux-gnu")
            ),
            PathBuf::from("qt5")
        );
        assert_eq!(
            compat_qt_dir(Path::new("/tmp/x/Qt/gcc_64"), Path::new("/tmp/x/AppDir/lib")),
            PathBuf::from("gcc_64")
        );
    }

    #[test]
    fn test_find_qt_dir_prefers_versioned_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        fs::create_dir_all(lib.join("qt5/plugins")).unwrap();
        fs::create_dir_all(dir.path().join("plugins")).unwrap();

        let qt = QtPlugins::default();
        let found = qt.find_qt_dir(&lib.join("libQt5Core.so.5"), "5").unwrap();
        assert_eq!(found, canonical_path(&lib.join("qt5")).unwrap());
    }

    #[test]
    fn test_find_qt_dir_parent_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("gcc_64/lib");
        fs::create_dir_all(&lib).unwrap();
        fs::create_dir_all(dir.path().join("gcc_64/plugins")).unwrap();

        let found = QtPlugins::default()
            .find_qt_dir(&lib.join("libQt5Core.so.5"), "5")
            .unwrap();
        assert_eq!(found, canonical_path(&dir.path().join("gcc_64")).unwrap());
    }

    #[test]
    fn test_find_qt_dir_from_hints() {
        let dir = tempfile::tempdir().unwrap();
        let qt_root = dir.path().join("Qt/6.5.0/gcc_64");
        fs::create_dir_all(qt_root.join("plugins")).unwrap();

        let qt = QtPlugins::new(vec![qt_root.clone()]);
        let found = qt
            .find_qt_dir(Path::new("/nonexistent/lib/libQt6Core.so.6"), "6")
            .unwrap();
        assert_eq!(found, canonical_path(&qt_root).unwrap());

        assert!(QtPlugins::default()
            .find_qt_dir(Path::new("/nonexistent/lib/libQt6Core.so.6"), "6")
            .is_none());
    }

    #[test]
    fn test_from_config_hints() {
        let config = Config::from_vars([
            ("QTDIR", "/opt/qt"),
            ("QT_PLUGIN_PATH", "/opt/qt6/plugins"),
        ]);
        let qt = QtPlugins::from_config(&config);
        assert_eq!(
            qt.extra_qt_dirs,
            vec![PathBuf::from("/opt/qt"), PathBuf::from("/opt/qt6/plugins/..")]
        );
    }

    #[test]
    fn test_deploy_without_qt_is_noop() {
        let mut resolver = DependencyResolver::with_search_context(
            Vec::new(),
            Default::default(),
            Vec::new(),
        );
        let mut env = AppRunEnv::new();
        let mut mapping = LibCompatMapping::new();
        let deployed = QtPlugins::default()
            .deploy(&mut resolver, &mut env, &mut mapping)
            .unwrap();
        assert!(!deployed);
        assert!(env.is_empty());
        assert!(mapping.is_empty());
    }
}
