//! The deploy pipeline: resolve, copy, wire the runtime, write the launch
//! environment and fetch AppRun.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::bundle::{
    deploy_compat_runtime, deploy_general_dependencies, libc_version, setup_default_runtime,
    AppRunEnv, BundleContext,
};
use crate::config::Config;
use crate::error::Unresolved;
use crate::fetch::{fetch_apprun, fetch_apprun_hooks};
use crate::framework::{FrameworkExtension, QtPlugins};
use crate::group::grouped;
use crate::process::find_tool;
use crate::resolve::{canonical_path, DependencyResolver};

/// Switches for the optional steps.
#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    /// Download AppRun and its hooks.
    pub fetch: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self { fetch: true }
    }
}

/// What a deploy produced.
#[derive(Debug)]
pub struct DeployReport {
    pub app_dir: PathBuf,
    /// Full resolved closure, executables and plugins included.
    pub dependencies: BTreeSet<PathBuf>,
    pub unresolved: Vec<Unresolved>,
    pub env: AppRunEnv,
    /// Bundle-relative path of the dynamic linker, if one was found.
    pub linker: Option<PathBuf>,
    pub copied: usize,
}

/// Deploy `executables` into `app_dir` using the host's search context.
///
/// `executables` must live inside `app_dir`; the first one is the program
/// AppRun launches.
pub fn deploy(
    app_dir: &Path,
    executables: &[PathBuf],
    config: &Config,
    options: DeployOptions,
) -> Result<DeployReport> {
    let extensions: Vec<Box<dyn FrameworkExtension>> =
        vec![Box::new(QtPlugins::from_config(config))];
    deploy_with(
        app_dir,
        executables,
        DependencyResolver::new(config),
        &extensions,
        config,
        options,
    )
}

/// [`deploy`] with an explicit resolver and set of framework extensions.
pub fn deploy_with(
    app_dir: &Path,
    executables: &[PathBuf],
    mut resolver: DependencyResolver,
    extensions: &[Box<dyn FrameworkExtension>],
    config: &Config,
    options: DeployOptions,
) -> Result<DeployReport> {
    let ci = config.ci;
    let mut ctx = BundleContext::new(app_dir)?;
    let executables = executables
        .iter()
        .map(|exe| canonical_path(exe))
        .collect::<crate::error::Result<Vec<_>>>()?;

    ctx.init_env(&executables, &libc_version())?;

    resolver
        .resolve_all(&executables)
        .context("Failed to resolve executable dependencies")?;

    for extension in extensions {
        let name = format!("Deploy {}", extension.name());
        grouped(&name, ci, || {
            extension.deploy(&mut resolver, &mut ctx.env, &mut ctx.mapping)
        })
        .with_context(|| format!("{} failed", name))?;
    }

    let unresolved = resolver.unresolved().to_vec();
    let deps = resolver.into_dependencies();

    let mut copied = grouped("Deploy general dependencies", ci, || {
        deploy_general_dependencies(&ctx, &deps)
    })?;
    copied += grouped("Deploy compat runtime", ci, || deploy_compat_runtime(&ctx, &deps))?;

    let linker = grouped("Setup default runtime", ci, || {
        let patchelf = match find_tool("patchelf", Some(config.patchelf.as_path()), &[]) {
            Ok(path) => Some(path),
            Err(e) => {
                println!("  [WARN] {}", e);
                None
            }
        };
        setup_default_runtime(&mut ctx, &deps, &executables, patchelf.as_deref())
    })?;

    grouped("Write AppRun.env", ci, || ctx.env.write(&ctx.app_dir))?;

    if options.fetch {
        grouped("Download AppRun hooks", ci, || {
            if let Err(e) = fetch_apprun_hooks(&ctx.app_dir, config) {
                println!("  [WARN] {:#}", e);
            }
        });
        grouped("Download AppRun", ci, || {
            if let Err(e) = fetch_apprun(&ctx.app_dir, config) {
                println!("  [WARN] {:#}", e);
            }
        });
    }

    Ok(DeployReport {
        app_dir: ctx.app_dir,
        dependencies: deps,
        unresolved,
        env: ctx.env,
        linker,
        copied,
    })
}
