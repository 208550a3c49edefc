//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `deploy` - Assemble an AppDir and pack it as an AppImage
//! - `deps` - Print the resolved dependency closure
//! - `show` - Display information

pub mod deploy;
pub mod deps;
pub mod show;

pub use deploy::cmd_deploy;
pub use deps::cmd_deps;
pub use show::cmd_show;
