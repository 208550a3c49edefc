//! AppDir assembly.
//!
//! Layout produced from a resolved dependency set:
//!
//! ```text
//! <app_dir>/lib/               general libraries
//! <app_dir>/runtime/compat/    bundled glibc (platform runtime)
//! <app_dir>/runtime/default/   symlink to the host's dynamic linker
//! <app_dir>/AppRun.env         launch environment
//! ```

pub mod compat;
pub mod env;
pub mod runtime;

use anyhow::{bail, Context, Result};
use path_clean::PathClean;
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

pub use compat::LibCompatMapping;
pub use env::{AppRunEnv, APPRUN_ENV_FILE};
pub use runtime::{classify, find_dynamic_loader, is_dynamic_loader, LibraryClass};

use crate::process::Cmd;
use crate::resolve::canonical_path;

/// Host locations checked for the real dynamic linker, in order.
const HOST_LOADER_DIRS: &[&str] = &["/lib64", "/lib"];

/// State shared by the assembly steps.
#[derive(Debug)]
pub struct BundleContext {
    /// Absolute AppDir root.
    pub app_dir: PathBuf,
    pub mapping: LibCompatMapping,
    pub env: AppRunEnv,
}

impl BundleContext {
    /// Context for `app_dir`, created if missing.
    pub fn new(app_dir: &Path) -> Result<Self> {
        let app_dir = canonical_path(app_dir)?;
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("Failed to create {}", app_dir.display()))?;
        Ok(Self {
            app_dir,
            mapping: LibCompatMapping::new(),
            env: AppRunEnv::new(),
        })
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.app_dir.join("lib")
    }

    pub fn compat_runtime_dir(&self) -> PathBuf {
        self.app_dir.join("runtime/compat")
    }

    pub fn default_runtime_dir(&self) -> PathBuf {
        self.app_dir.join("runtime/default")
    }

    /// Whether `path` already lives inside the AppDir.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.app_dir)
    }

    /// Where `dep` is copied inside the AppDir. Fails when the compat
    /// mapping would place it outside.
    pub fn destination(&self, dep: &Path) -> Result<PathBuf> {
        let root = match classify(dep) {
            LibraryClass::PlatformRuntime => self.compat_runtime_dir(),
            LibraryClass::General => self.lib_dir(),
        };
        let dest = root.join(self.mapping.compat_path(dep)).clean();
        if !self.contains(&dest) {
            bail!(
                "Destination {} of {} is outside the AppDir {}",
                dest.display(),
                dep.display(),
                self.app_dir.display()
            );
        }
        Ok(dest)
    }

    /// Seed the launch environment. `executables[0]` is the program
    /// AppRun starts.
    pub fn init_env(&mut self, executables: &[PathBuf], libc_version: &str) -> Result<()> {
        let main = executables
            .first()
            .context("At least one executable is required")?;
        let main = canonical_path(main)?;
        let exec_rel = main
            .strip_prefix(&self.app_dir)
            .with_context(|| {
                format!(
                    "Executable {} is not inside the AppDir {}",
                    main.display(),
                    self.app_dir.display()
                )
            })?;

        let env = &mut self.env;
        env.set("APPDIR", "$ORIGIN");
        env.set("APPDIR_EXEC_PATH", format!("$APPDIR/{}", exec_rel.display()));
        env.set("APPDIR_EXEC_ARGS", "$@");
        env.set("APPDIR_LIBRARY_PATH", "$APPDIR/lib");
        env.set("APPDIR_LIBC_LIBRARY_PATH", "$APPDIR/runtime/compat");
        env.set("APPDIR_LIBC_VERSION", libc_version);
        env.set(
            "XDG_DATA_DIRS",
            "$APPDIR/usr/local/share:$APPDIR/usr/share:$XDG_DATA_DIRS",
        );
        env.set("XDG_CONFIG_DIRS", "$APPDIR/etc/xdg:$XDG_CONFIG_DIRS");
        env.set("PATH", "$APPDIR/usr/bin:$PATH");
        env.set("GTK_EXE_PREFIX", "$APPDIR/usr");
        env.set("GTK_DATA_PREFIX", "$APPDIR/usr");
        Ok(())
    }
}

/// Copy every general library into `lib/`. Returns the number copied.
pub fn deploy_general_dependencies(ctx: &BundleContext, deps: &BTreeSet<PathBuf>) -> Result<usize> {
    fs::create_dir_all(ctx.lib_dir())
        .with_context(|| format!("Failed to create {}", ctx.lib_dir().display()))?;
    deploy_class(ctx, deps, LibraryClass::General, "dependencies")
}

/// Copy every platform-runtime library into `runtime/compat/`.
pub fn deploy_compat_runtime(ctx: &BundleContext, deps: &BTreeSet<PathBuf>) -> Result<usize> {
    fs::create_dir_all(ctx.compat_runtime_dir())
        .with_context(|| format!("Failed to create {}", ctx.compat_runtime_dir().display()))?;
    deploy_class(ctx, deps, LibraryClass::PlatformRuntime, "runtime")
}

fn deploy_class(
    ctx: &BundleContext,
    deps: &BTreeSet<PathBuf>,
    class: LibraryClass,
    label: &str,
) -> Result<usize> {
    let mut copied = 0;
    for dep in deps {
        if ctx.contains(dep) || classify(dep) != class {
            continue;
        }
        println!("Found {}: {}", label, dep.display());
        let dest = ctx.destination(dep)?;
        copy_file(dep, &dest)?;
        copied += 1;
    }
    Ok(copied)
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if src == dest {
        bail!("Refusing to copy {} onto itself", src.display());
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(src, dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(())
}

/// The host's own copy of the loader named `loader_name`.
pub fn host_loader_path(loader_name: &str) -> PathBuf {
    HOST_LOADER_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(loader_name))
        .find(|p| p.exists())
        .unwrap_or_else(|| Path::new("/lib").join(loader_name))
}

/// Link `runtime/default/<loader>` to the host loader, point every
/// executable's interpreter at the bundled one and record
/// `APPDIR_LIBC_LINKER_PATH`.
///
/// Returns the loader's bundle-relative path, or `None` when no loader was
/// resolved (static executables). Without patchelf the interpreters are left
/// alone with a warning.
pub fn setup_default_runtime(
    ctx: &mut BundleContext,
    deps: &BTreeSet<PathBuf>,
    executables: &[PathBuf],
    patchelf: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let default_dir = ctx.default_runtime_dir();
    fs::create_dir_all(&default_dir)
        .with_context(|| format!("Failed to create {}", default_dir.display()))?;

    let Some(loader) = find_dynamic_loader(deps) else {
        println!("No ld-linux found, skipping default runtime");
        return Ok(None);
    };
    println!("Found ld-linux: {}", loader.display());

    let ld_compat = ctx.mapping.compat_path(loader);
    let loader_name = loader
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let host_loader = host_loader_path(&loader_name);

    let link = default_dir.join(&ld_compat).clean();
    if !ctx.contains(&link) {
        bail!(
            "Loader link {} is outside the AppDir {}",
            link.display(),
            ctx.app_dir.display()
        );
    }
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if link.symlink_metadata().is_ok() {
        fs::remove_file(&link)
            .with_context(|| format!("Failed to remove stale {}", link.display()))?;
    }
    symlink(&host_loader, &link).with_context(|| {
        format!(
            "Failed to link {} -> {}",
            link.display(),
            host_loader.display()
        )
    })?;

    for exe in executables {
        match patchelf {
            Some(patchelf) => set_interpreter(patchelf, &ld_compat, exe),
            None => println!(
                "  [WARN] patchelf unavailable, interpreter of {} not updated",
                exe.display()
            ),
        }
    }

    ctx.env
        .set("APPDIR_LIBC_LINKER_PATH", ld_compat.display().to_string());
    Ok(Some(ld_compat))
}

/// Rewrite the `PT_INTERP` of `exe` with patchelf. Failure is a warning.
pub fn set_interpreter(patchelf: &Path, interpreter: &Path, exe: &Path) {
    println!("Updating interpreter for {}", exe.display());
    let result = Cmd::new(patchelf)
        .arg("--set-interpreter")
        .arg_path(interpreter)
        .arg_path(exe)
        .error_msg(format!("patchelf failed on {}", exe.display()))
        .run();
    if let Err(e) = result {
        println!("  [WARN] {:#}", e);
    }
}

/// Host glibc version (`2.31`), or empty when it can't be determined.
pub fn libc_version() -> String {
    match Cmd::new("getconf").arg("GNU_LIBC_VERSION").run() {
        Ok(result) => parse_libc_version(result.stdout_trimmed()),
        Err(e) => {
            println!("  [WARN] Could not determine glibc version: {:#}", e);
            String::new()
        }
    }
}

/// `glibc 2.31` -> `2.31`.
fn parse_libc_version(output: &str) -> String {
    output
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}
