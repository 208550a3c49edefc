//! Library lookup following the dynamic linker's search order.
//!
//! With a non-empty RUNPATH the linker ignores RPATH entirely:
//!
//! ```text
//! RUNPATH set:   LD_LIBRARY_PATH -> RUNPATH -> ld.so.cache -> default dirs
//! RUNPATH empty: RPATH -> LD_LIBRARY_PATH -> ld.so.cache -> default dirs
//! ```
//!
//! RPATH and RUNPATH belong to the binary that declared the dependency;
//! `LD_LIBRARY_PATH`, the cache and the default directories are the same
//! for every lookup and live in [`Locator`].

use std::path::PathBuf;

use crate::ldconfig::LdconfigCache;

/// Default directories on 64-bit hosts.
pub const DEFAULT_DIRS_64: &[&str] = &["/lib64", "/usr/lib64", "/lib", "/usr/lib"];

/// Default directories everywhere else.
pub const DEFAULT_DIRS_32: &[&str] = &["/lib", "/usr/lib"];

/// The built-in directories for the architecture this tool runs on.
pub fn default_lib_dirs() -> Vec<PathBuf> {
    let dirs = if cfg!(target_pointer_width = "64") {
        DEFAULT_DIRS_64
    } else {
        DEFAULT_DIRS_32
    };
    dirs.iter().map(PathBuf::from).collect()
}

/// Where a library was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrigin {
    /// The `DT_NEEDED` entry was already an absolute path.
    Absolute,
    Rpath,
    LdLibraryPath,
    Runpath,
    LdconfigCache,
    DefaultDir,
}

/// Process-wide part of the search context.
#[derive(Debug, Clone, Copy)]
pub struct Locator<'a> {
    pub ld_library_path: &'a [PathBuf],
    pub ldconfig: &'a LdconfigCache,
    pub default_dirs: &'a [PathBuf],
}

impl Locator<'_> {
    /// Resolve `name` to a path, or `None` when no rule matches.
    pub fn locate(&self, name: &str, rpath: &[PathBuf], runpath: &[PathBuf]) -> Option<PathBuf> {
        self.locate_with_origin(name, rpath, runpath)
            .map(|(path, _)| path)
    }

    /// Like [`Locator::locate`], also reporting which rule matched.
    pub fn locate_with_origin(
        &self,
        name: &str,
        rpath: &[PathBuf],
        runpath: &[PathBuf],
    ) -> Option<(PathBuf, SearchOrigin)> {
        if name.starts_with('/') {
            return Some((PathBuf::from(name), SearchOrigin::Absolute));
        }

        let search_dirs: Vec<(&[PathBuf], SearchOrigin)> = if runpath.is_empty() {
            vec![
                (rpath, SearchOrigin::Rpath),
                (self.ld_library_path, SearchOrigin::LdLibraryPath),
            ]
        } else {
            vec![
                (self.ld_library_path, SearchOrigin::LdLibraryPath),
                (runpath, SearchOrigin::Runpath),
            ]
        };

        for (dirs, origin) in search_dirs {
            if let Some(path) = find_in_dirs(name, dirs) {
                return Some((path, origin));
            }
        }

        if let Some(path) = self.ldconfig.lookup(name) {
            return Some((path.to_path_buf(), SearchOrigin::LdconfigCache));
        }

        find_in_dirs(name, self.default_dirs).map(|path| (path, SearchOrigin::DefaultDir))
    }
}

/// First `dir/name` that exists. Empty entries are skipped.
fn find_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
}
