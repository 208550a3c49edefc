//! `AppRun.env`: launch environment consumed by the AppRun launcher.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Name of the generated environment file in the AppDir root.
pub const APPRUN_ENV_FILE: &str = "AppRun.env";

/// Insertion-ordered `KEY=VALUE` map.
///
/// Setting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppRunEnv {
    vars: Vec<(String, String)>,
}

impl AppRunEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// File contents, one `KEY=VALUE` per line.
    pub fn render(&self) -> String {
        self.iter().map(|(k, v)| format!("{}={}\n", k, v)).collect()
    }

    /// Write `AppRun.env` into `app_dir`, echoing each line.
    pub fn write(&self, app_dir: &Path) -> Result<()> {
        for (key, value) in self.iter() {
            println!("{}={}", key, value);
        }
        let path = app_dir.join(APPRUN_ENV_FILE);
        fs::write(&path, self.render())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
