//! Helper runtime downloads.
//!
//! The AppRun launcher, its preload hooks and appimagetool are fetched from
//! their GitHub releases with `curl`. Each file is kept under the cache dir,
//! keyed by release, so repeated deploys don't hit the network.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::process::{find_tool, Cmd};

pub const APPRUN_RELEASES_URL: &str =
    "https://github.com/AppImageCrafters/AppRun/releases/download";
pub const APPIMAGETOOL_RELEASE_URL: &str =
    "https://github.com/AppImage/AppImageKit/releases/download/continuous";

/// Installed name of the preload hooks inside `lib/`.
pub const APPRUN_HOOKS_NAME: &str = "libapprun_hooks.so";

pub fn apprun_hooks_url(version: &str, arch: &str) -> String {
    format!(
        "{}/{}/libapprun_hooks-Release-{}.so",
        APPRUN_RELEASES_URL, version, arch
    )
}

pub fn apprun_url(version: &str, arch: &str) -> String {
    format!("{}/{}/AppRun-Release-{}", APPRUN_RELEASES_URL, version, arch)
}

pub fn appimagetool_url(host_arch: &str) -> String {
    format!(
        "{}/appimagetool-{}.AppImage",
        APPIMAGETOOL_RELEASE_URL, host_arch
    )
}

/// Make a file executable (chmod 755).
pub fn make_executable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
    Ok(())
}

/// Download `url` to `cached` unless it's already there.
///
/// The transfer goes to `<cached>.part` and is renamed on success, so an
/// interrupted download never looks complete.
pub fn fetch_cached(url: &str, cached: &Path) -> Result<PathBuf> {
    if cached.is_file() {
        println!("Using cached {}", cached.display());
        return Ok(cached.to_path_buf());
    }

    if let Some(parent) = cached.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let curl = find_tool("curl", None, &[])?;
    let mut part = cached.as_os_str().to_os_string();
    part.push(".part");
    let part = PathBuf::from(part);

    println!("Fetching {}", url);
    let result = Cmd::new(&curl)
        .args(["-fsSL", "-o"])
        .arg_path(&part)
        .arg(url)
        .error_msg(format!("Download of {} failed", url))
        .run();
    if let Err(e) = result {
        let _ = fs::remove_file(&part);
        return Err(e);
    }

    fs::rename(&part, cached).with_context(|| {
        format!("Failed to move {} to {}", part.display(), cached.display())
    })?;
    Ok(cached.to_path_buf())
}

/// Fetch through the cache, then copy into `dest`.
fn fetch_to(url: &str, cached: &Path, dest: &Path) -> Result<()> {
    let cached = fetch_cached(url, cached)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(&cached, dest)
        .with_context(|| format!("Failed to copy {} to {}", cached.display(), dest.display()))?;
    Ok(())
}

fn apprun_cache_dir(config: &Config) -> PathBuf {
    config
        .cache_dir
        .join("apprun")
        .join(&config.apprun_version)
        .join(&config.target_arch)
}

/// Install the AppRun preload hooks as `lib/libapprun_hooks.so`.
pub fn fetch_apprun_hooks(app_dir: &Path, config: &Config) -> Result<PathBuf> {
    let url = apprun_hooks_url(&config.apprun_version, &config.target_arch);
    let dest = app_dir.join("lib").join(APPRUN_HOOKS_NAME);
    fetch_to(&url, &apprun_cache_dir(config).join(APPRUN_HOOKS_NAME), &dest)?;
    Ok(dest)
}

/// Install the AppRun launcher as `<app_dir>/AppRun`, executable.
pub fn fetch_apprun(app_dir: &Path, config: &Config) -> Result<PathBuf> {
    let url = apprun_url(&config.apprun_version, &config.target_arch);
    let dest = app_dir.join("AppRun");
    fetch_to(&url, &apprun_cache_dir(config).join("AppRun"), &dest)?;
    make_executable(&dest)?;
    Ok(dest)
}

/// Cached appimagetool for the host architecture, executable.
pub fn fetch_appimagetool(config: &Config) -> Result<PathBuf> {
    let cached = config
        .cache_dir
        .join("appimagetool")
        .join(format!("appimagetool-{}.AppImage", config.host_arch));
    let tool = fetch_cached(&appimagetool_url(&config.host_arch), &cached)?;
    make_executable(&tool)?;
    Ok(tool)
}
