//! Framework-specific deployment.
//!
//! Some frameworks load code at runtime that no `DT_NEEDED` entry mentions
//! (Qt platform and image plugins). An extension finds those files, feeds
//! them through the resolver and adjusts the bundle layout and launch
//! environment so the framework finds them again inside the AppDir.

pub mod qt;

use anyhow::Result;

use crate::bundle::{AppRunEnv, LibCompatMapping};
use crate::resolve::DependencyResolver;

pub use qt::QtPlugins;

/// A framework that contributes files beyond the linker-visible closure.
pub trait FrameworkExtension {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Detect the framework among the resolved dependencies and add what it
    /// needs. Returns `false` when the framework isn't used.
    fn deploy(
        &self,
        resolver: &mut DependencyResolver,
        env: &mut AppRunEnv,
        mapping: &mut LibCompatMapping,
    ) -> Result<bool>;
}
