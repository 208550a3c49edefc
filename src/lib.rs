//! appdeploy: package a Linux application and its shared-library closure
//! into a self-contained AppDir / AppImage.
//!
//! The resolution primitives ([`elf`], [`locate`], [`resolve`]) mirror what
//! the dynamic linker does at load time. [`bundle`] lays the result out in
//! the AppDir, and [`deploy`] runs the whole pipeline.

pub mod appimage;
pub mod bundle;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod elf;
pub mod error;
pub mod fetch;
pub mod framework;
pub mod group;
pub mod ldconfig;
pub mod locate;
pub mod process;
pub mod resolve;

pub use config::Config;
pub use error::{Error, Result, Unresolved};
pub use resolve::{resolve, DependencyResolver};
