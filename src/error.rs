//! Error types for the dependency resolution primitives.
//!
//! Only conditions that stop work on a binary are errors. A dependency that
//! cannot be located is recorded as [`Unresolved`] and resolution continues.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading binaries or querying system tools.
#[derive(Debug, Error)]
pub enum Error {
    #[error("binary not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a valid ELF object: {} ({reason})", path.display())]
    MalformedBinary { path: PathBuf, reason: String },

    #[error("external tool '{tool}' is not available")]
    ExternalToolUnavailable { tool: String },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Map an I/O error on `path` to `NotFound` or `Io`.
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound { path }
        } else {
            Error::Io { path, source }
        }
    }
}

/// A required library that no search rule could locate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// Library name as recorded in `DT_NEEDED`.
    pub name: String,
    /// Binary that declared the dependency.
    pub required_by: PathBuf,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not find library {} required by {}",
            self.name,
            self.required_by.display()
        )
    }
}
