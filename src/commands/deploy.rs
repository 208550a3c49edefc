//! Deploy command - assembles the AppDir and packs it.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::appimage::make_app_image;
use crate::config::Config;
use crate::deploy::{deploy, DeployOptions};
use crate::group::grouped;

/// Split the `--executables` argument (`A:B:C`).
pub fn parse_executables(list: &str) -> Vec<PathBuf> {
    list.split(':')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Execute the deploy command.
pub fn cmd_deploy(
    app_dir: &Path,
    executables: &str,
    target: &Path,
    no_appimage: bool,
    no_fetch: bool,
    config: &Config,
) -> Result<()> {
    let executables = parse_executables(executables);
    if executables.is_empty() {
        bail!("No executables given. Pass --executables PATH[:PATH...]");
    }

    let report = deploy(
        app_dir,
        &executables,
        config,
        DeployOptions { fetch: !no_fetch },
    )?;

    println!(
        "Deployed {} libraries into {}",
        report.copied,
        report.app_dir.display()
    );
    if !report.unresolved.is_empty() {
        println!(
            "  [WARN] {} dependencies could not be resolved",
            report.unresolved.len()
        );
    }

    if no_appimage {
        println!("Skipping AppImage (--no-appimage)");
        return Ok(());
    }

    grouped("Make AppImage", config.ci, || {
        make_app_image(&report.app_dir, target, config)
    })
}
