//! Dynamic linker cache (`ldconfig -p`).
//!
//! The cache is immutable system state for the lifetime of the process, so
//! the resolver queries it once and reuses it for every lookup.

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::Config;
use crate::process::{find_tool, Cmd};

/// `ldconfig` often lives outside a regular user's `PATH`.
const LDCONFIG_FALLBACKS: &[&str] = &["/sbin/ldconfig", "/usr/sbin/ldconfig"];

/// One `ldconfig -p` entry:
/// `\tlibz.so.1 (libc6,x86-64) => /lib/x86_64-linux-gnu/libz.so.1`
static LDCONFIG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(\S+)\s+\((.*)\)\s+=>\s+(.*)$").expect("static regex")
});

/// Library name to installed paths, in the order `ldconfig` reports them.
#[derive(Debug, Clone, Default)]
pub struct LdconfigCache {
    paths: HashMap<String, Vec<PathBuf>>,
}

impl LdconfigCache {
    /// Parse `ldconfig -p` output. Lines that don't look like entries
    /// (the "N libs found in cache" header) are skipped.
    pub fn parse(output: &str) -> Self {
        let mut paths: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for line in output.lines() {
            if let Some(caps) = LDCONFIG_LINE.captures(line) {
                paths
                    .entry(caps[1].to_string())
                    .or_default()
                    .push(PathBuf::from(caps[3].trim_end()));
            }
        }
        Self { paths }
    }

    /// Run `ldconfig -p` and parse it.
    ///
    /// A missing tool or failing run degrades to an empty cache with a
    /// warning; the other search rules still apply.
    pub fn query(config: &Config) -> Self {
        let ldconfig = match find_tool("ldconfig", config.ldconfig.as_deref(), LDCONFIG_FALLBACKS) {
            Ok(path) => path,
            Err(e) => {
                println!("  [WARN] {} (library cache lookups disabled)", e);
                return Self::default();
            }
        };

        match Cmd::new(&ldconfig).arg("-p").run() {
            Ok(result) => Self::parse(&result.stdout),
            Err(e) => {
                println!("  [WARN] {:#} (library cache lookups disabled)", e);
                Self::default()
            }
        }
    }

    /// First path known for `name`.
    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.paths
            .get(name)
            .and_then(|paths| paths.first())
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<N: Into<String>, P: Into<PathBuf>> FromIterator<(N, P)> for LdconfigCache {
    fn from_iter<T: IntoIterator<Item = (N, P)>>(iter: T) -> Self {
        let mut paths: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for (name, path) in iter {
            paths.entry(name.into()).or_default().push(path.into());
        }
        Self { paths }
    }
}
