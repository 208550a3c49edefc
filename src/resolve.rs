//! Transitive shared-library resolution.
//!
//! [`DependencyResolver`] owns the visited set, which is also the result: a
//! path is inserted before its dependencies are read, so cycles between
//! libraries terminate and no path is processed twice.

use anyhow::Context;
use path_clean::PathClean;
use regex::Regex;
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::config::Config;
use crate::elf::read_metadata;
use crate::error::{Error, Result, Unresolved};
use crate::ldconfig::LdconfigCache;
use crate::locate::{default_lib_dirs, Locator};

/// `libfoo.so`, `libfoo.so.1`, `libfoo.so.1.2.3`
static SHARED_LIB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*\.so(?:\.\d+)*$").expect("static regex"));

/// Whether a file name looks like a shared library.
pub fn is_shared_library_name(name: &str) -> bool {
    SHARED_LIB_NAME.is_match(name)
}

/// Absolute, lexically normalized form of `path`. Symlinks are not followed.
pub fn canonical_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| Error::from_io(path, e))?;
    Ok(absolute.clean())
}

/// Where the ldconfig cache comes from.
#[derive(Debug)]
enum CacheSource {
    /// Run `ldconfig -p` on first use.
    Query(Config),
    /// Supplied up front.
    Fixed,
}

/// Resolution context for one deploy run.
#[derive(Debug)]
pub struct DependencyResolver {
    visited: BTreeSet<PathBuf>,
    unresolved: Vec<Unresolved>,
    ld_library_path: Vec<PathBuf>,
    default_dirs: Vec<PathBuf>,
    cache_source: CacheSource,
    ldconfig: OnceCell<LdconfigCache>,
}

impl DependencyResolver {
    /// Resolver using the host's search context. The ldconfig cache is
    /// queried lazily, at most once.
    pub fn new(config: &Config) -> Self {
        Self {
            visited: BTreeSet::new(),
            unresolved: Vec::new(),
            ld_library_path: config.ld_library_path.clone(),
            default_dirs: default_lib_dirs(),
            cache_source: CacheSource::Query(config.clone()),
            ldconfig: OnceCell::new(),
        }
    }

    /// Resolver with an explicit search context (no system queries).
    pub fn with_search_context(
        ld_library_path: Vec<PathBuf>,
        ldconfig: LdconfigCache,
        default_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            visited: BTreeSet::new(),
            unresolved: Vec::new(),
            ld_library_path,
            default_dirs,
            cache_source: CacheSource::Fixed,
            ldconfig: OnceCell::from(ldconfig),
        }
    }

    fn ldconfig(&self) -> &LdconfigCache {
        self.ldconfig.get_or_init(|| match &self.cache_source {
            CacheSource::Query(config) => LdconfigCache::query(config),
            CacheSource::Fixed => LdconfigCache::default(),
        })
    }

    /// Add `binary` and everything it transitively needs.
    ///
    /// Unlocatable dependencies are printed as warnings and recorded in
    /// [`DependencyResolver::unresolved`]; they never fail the call.
    pub fn resolve(&mut self, binary: &Path) -> anyhow::Result<()> {
        let path = canonical_path(binary)?;
        if !self.visited.insert(path.clone()) {
            return Ok(());
        }

        let metadata = read_metadata(&path)?;

        let mut found = Vec::new();
        let mut missing = Vec::new();
        {
            let locator = Locator {
                ld_library_path: &self.ld_library_path,
                ldconfig: self.ldconfig(),
                default_dirs: &self.default_dirs,
            };
            for name in &metadata.needed {
                match locator.locate(name, &metadata.rpath, &metadata.runpath) {
                    Some(dep) => found.push(dep),
                    None => missing.push(Unresolved {
                        name: name.clone(),
                        required_by: path.clone(),
                    }),
                }
            }
        }

        for m in missing {
            println!("  [WARN] {}", m);
            self.unresolved.push(m);
        }

        for dep in found {
            self.resolve(&dep)
                .with_context(|| format!("while resolving dependencies of {}", path.display()))?;
        }

        Ok(())
    }

    /// Resolve each path in turn into the same set.
    pub fn resolve_all<I, P>(&mut self, binaries: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for binary in binaries {
            self.resolve(binary.as_ref())?;
        }
        Ok(())
    }

    /// Resolve every shared library under `dir`, recursively.
    ///
    /// A directory that doesn't exist contributes nothing.
    pub fn resolve_lib_dir(&mut self, dir: &Path) -> anyhow::Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_shared_library_name(&name) {
                self.resolve(entry.path())?;
            }
        }
        Ok(())
    }

    pub fn contains(&self, path: &Path) -> bool {
        canonical_path(path)
            .map(|p| self.visited.contains(&p))
            .unwrap_or(false)
    }

    /// Every path resolved so far, input binaries included.
    pub fn dependencies(&self) -> &BTreeSet<PathBuf> {
        &self.visited
    }

    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    pub fn into_dependencies(self) -> BTreeSet<PathBuf> {
        self.visited
    }
}

/// Resolve the full closure of `binaries` against the host.
pub fn resolve<I, P>(binaries: I, config: &Config) -> anyhow::Result<BTreeSet<PathBuf>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut resolver = DependencyResolver::new(config);
    resolver.resolve_all(binaries)?;
    Ok(resolver.into_dependencies())
}
