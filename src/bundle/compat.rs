//! Bundle-relative destination paths for resolved libraries.
//!
//! System libraries lose their standard prefix and any multiarch triplet
//! (`/usr/lib/x86_64-linux-gnu/libssl.so.3` -> `libssl.so.3`). Libraries from
//! non-standard locations registered in [`LibCompatMapping`] keep their layout
//! below a short relative prefix instead, so they can't collide.

use std::path::{Component, Path, PathBuf};

/// Standard library prefixes stripped from system paths.
pub const STANDARD_PREFIXES: &[&str] = &[
    "/usr/lib",
    "/lib",
    "/usr/lib64",
    "/lib64",
    "/usr/local/lib",
    "/usr/local/lib64",
];

/// Suffix of a multiarch directory such as `x86_64-linux-gnu`.
const ARCH_TRIPLET_SUFFIX: &str = "-linux-gnu";

/// Absolute source directory -> bundle-relative prefix.
///
/// Entries keep insertion order and the first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct LibCompatMapping {
    entries: Vec<(PathBuf, PathBuf)>,
}

impl LibCompatMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source_dir`. Re-registering a directory replaces its prefix.
    pub fn insert(&mut self, source_dir: impl Into<PathBuf>, compat: impl Into<PathBuf>) {
        let source_dir = source_dir.into();
        let compat = compat.into();
        match self.entries.iter_mut().find(|(dir, _)| *dir == source_dir) {
            Some(entry) => entry.1 = compat,
            None => self.entries.push((source_dir, compat)),
        }
    }

    pub fn get(&self, source_dir: &Path) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(dir, _)| dir == source_dir)
            .map(|(_, compat)| compat.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries.iter().map(|(d, c)| (d.as_path(), c.as_path()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bundle-relative path for the library at `path`.
    pub fn compat_path(&self, path: &Path) -> PathBuf {
        for (dir, compat) in &self.entries {
            if let Ok(rest) = path.strip_prefix(dir) {
                return compat.join(rest);
            }
        }

        for prefix in STANDARD_PREFIXES {
            if let Ok(rest) = path.strip_prefix(prefix) {
                if rest.as_os_str().is_empty() {
                    continue;
                }
                return strip_arch_triplet(rest);
            }
        }

        path.strip_prefix("/").unwrap_or(path).to_path_buf()
    }
}

/// Drop a leading `<anything>-linux-gnu` directory.
fn strip_arch_triplet(rest: &Path) -> PathBuf {
    let mut components = rest.components();
    if let Some(Component::Normal(first)) = components.next() {
        let tail = components.as_path();
        if !tail.as_os_str().is_empty()
            && first.to_string_lossy().ends_with(ARCH_TRIPLET_SUFFIX)
        {
            return tail.to_path_buf();
        }
    }
    rest.to_path_buf()
}
