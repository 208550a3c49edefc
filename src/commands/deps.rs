//! Deps command - prints the resolved closure of some binaries.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Unresolved;
use crate::resolve::DependencyResolver;

/// Machine-readable form of a resolution run.
#[derive(Debug, Serialize)]
pub struct DepsReport {
    pub dependencies: Vec<PathBuf>,
    pub unresolved: Vec<UnresolvedEntry>,
}

#[derive(Debug, Serialize)]
pub struct UnresolvedEntry {
    pub name: String,
    pub required_by: PathBuf,
}

impl From<&Unresolved> for UnresolvedEntry {
    fn from(u: &Unresolved) -> Self {
        Self {
            name: u.name.clone(),
            required_by: u.required_by.clone(),
        }
    }
}

impl DepsReport {
    pub fn from_resolver(resolver: &DependencyResolver) -> Self {
        Self {
            dependencies: resolver.dependencies().iter().cloned().collect(),
            unresolved: resolver.unresolved().iter().map(Into::into).collect(),
        }
    }
}

/// Execute the deps command.
pub fn cmd_deps(
    binaries: &[PathBuf],
    lib_dirs: &[PathBuf],
    json: bool,
    config: &Config,
) -> Result<()> {
    let mut resolver = DependencyResolver::new(config);
    resolver.resolve_all(binaries)?;
    for dir in lib_dirs {
        resolver
            .resolve_lib_dir(dir)
            .with_context(|| format!("Failed to scan {}", dir.display()))?;
    }

    let report = DepsReport::from_resolver(&resolver);
    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
        return Ok(());
    }

    for dep in &report.dependencies {
        println!("{}", dep.display());
    }
    if !report.unresolved.is_empty() {
        println!();
        println!("Unresolved:");
        for u in &report.unresolved {
            println!("  {} (required by {})", u.name, u.required_by.display());
        }
    }
    Ok(())
}
