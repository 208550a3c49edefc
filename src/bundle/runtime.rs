//! Base C runtime classification.
//!
//! Libraries matching [`PLATFORM_RUNTIME_PATTERNS`] belong to glibc (plus the
//! few libraries that must always match its version). They go to
//! `runtime/compat/` so the launcher can pick between them and the host's
//! copies; everything else goes to `lib/`.
//!
//! Patterns match a prefix of the file name.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File-name patterns of the base C runtime, with and without versions.
pub const PLATFORM_RUNTIME_PATTERNS: &[&str] = &[
    r"ld-.*\.so",
    r"ld-linux.*\.so(?:\.\d+)*",
    r"libBrokenLocale-.*\.so",
    r"libBrokenLocale\.so(?:\.\d+)*",
    r"libSegFault\.so",
    r"libanl-.*\.so",
    r"libanl\.so(?:\.\d+)*",
    r"libc-.*\.so",
    r"libc\.so(?:\.\d+)*",
    r"libcrypt\.so(?:\.\d+)*",
    r"libdl-.*\.so",
    r"libdl\.so(?:\.\d+)*",
    r"libgcc_s\.so(?:\.\d+)*",
    r"libm-.*\.so",
    r"libm\.so(?:\.\d+)*",
    r"libmemusage\.so(?:\.\d+)*",
    r"libmvec-.*\.so",
    r"libmvec\.so(?:\.\d+)*",
    r"libnsl-.*\.so",
    r"libnsl\.so(?:\.\d+)*",
    r"libnss_compat-.*\.so",
    r"libnss_compat\.so(?:\.\d+)*",
    r"libnss_dns-.*\.so",
    r"libnss_dns\.so(?:\.\d+)*",
    r"libnss_files-.*\.so",
    r"libnss_files\.so(?:\.\d+)*",
    r"libnss_hesiod-.*\.so",
    r"libnss_hesiod\.so(?:\.\d+)*",
    r"libnss_nis-.*\.so",
    r"libnss_nis\.so(?:\.\d+)*",
    r"libnss_nisplus-.*\.so",
    r"libnss_nisplus\.so(?:\.\d+)*",
    r"libpcprofile\.so",
    r"libpthread-.*\.so",
    r"libpthread\.so(?:\.\d+)*",
    r"libresolv-.*\.so",
    r"libresolv\.so(?:\.\d+)*",
    r"librt-.*\.so",
    r"librt\.so(?:\.\d+)*",
    r"libthread_db-.*\.so",
    r"libthread_db\.so(?:\.\d+)*",
    r"libutil-.*\.so",
    r"libutil\.so(?:\.\d+)*",
    r"libz\.so(?:\.\d+)*",
];

static PLATFORM_RUNTIME: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = PLATFORM_RUNTIME_PATTERNS.join("|");
    Regex::new(&format!("^(?:{})", alternatives)).expect("static regex")
});

static DYNAMIC_LOADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ld-linux.*\.so(?:\.\d+)*").expect("static regex"));

/// Destination class of a resolved library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryClass {
    /// Copied to `runtime/compat/`.
    PlatformRuntime,
    /// Copied to `lib/`.
    General,
}

fn file_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default()
}

pub fn classify(path: &Path) -> LibraryClass {
    if PLATFORM_RUNTIME.is_match(&file_name(path)) {
        LibraryClass::PlatformRuntime
    } else {
        LibraryClass::General
    }
}

/// Whether `path` is the dynamic linker (`ld-linux*.so[.N]*`).
pub fn is_dynamic_loader(path: &Path) -> bool {
    DYNAMIC_LOADER.is_match(&file_name(path))
}

/// First dynamic linker among `deps`.
pub fn find_dynamic_loader<'a, I>(deps: I) -> Option<&'a PathBuf>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    deps.into_iter().find(|p| is_dynamic_loader(p))
}
