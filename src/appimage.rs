//! AppImage packing with appimagetool.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::fetch::fetch_appimagetool;
use crate::process::Cmd;

/// Pack `app_dir` into the AppImage `dest`.
pub fn make_app_image(app_dir: &Path, dest: &Path, config: &Config) -> Result<()> {
    let tool = fetch_appimagetool(config).context("appimagetool is unavailable")?;
    pack_with(&tool, app_dir, dest)
}

/// Run `tool APP_DIR DEST -v` with the tool's output shown.
pub fn pack_with(tool: &Path, app_dir: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Cmd::new(tool)
        .arg_path(app_dir)
        .arg_path(dest)
        .arg("-v")
        .error_msg(format!("appimagetool failed to pack {}", app_dir.display()))
        .run_interactive()?;
    println!("AppImage written to {}", dest.display());
    Ok(())
}
