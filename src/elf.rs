//! ELF dynamic-section reader.
//!
//! Reads `DT_NEEDED`, `DT_RPATH` and `DT_RUNPATH` directly from the file with
//! goblin instead of shelling out to `readelf` or `ldd`. Nothing is executed,
//! so binaries built for another architecture are read the same way.

use goblin::elf::Elf;
use path_clean::PathClean;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// ELF magic bytes: 0x7f followed by ASCII "ELF".
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Dynamic linking metadata of one binary.
///
/// Search directories are already `$ORIGIN`-expanded and lexically cleaned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElfMetadata {
    /// `DT_NEEDED` names in file order, duplicates preserved.
    pub needed: Vec<String>,
    /// `DT_RPATH` directories, colon-split.
    pub rpath: Vec<PathBuf>,
    /// `DT_RUNPATH` directories, colon-split.
    pub runpath: Vec<PathBuf>,
}

/// Read the dynamic metadata of the ELF file at `path`.
///
/// A statically linked binary (no dynamic section) yields empty lists.
pub fn read_metadata(path: &Path) -> Result<ElfMetadata> {
    let bytes = fs::read(path).map_err(|e| Error::from_io(path, e))?;

    if bytes.len() < ELF_MAGIC.len() || bytes[..ELF_MAGIC.len()] != ELF_MAGIC {
        return Err(Error::MalformedBinary {
            path: path.to_path_buf(),
            reason: "missing ELF magic".to_string(),
        });
    }

    let elf = Elf::parse(&bytes).map_err(|e| Error::MalformedBinary {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if elf.dynamic.is_none() {
        return Ok(ElfMetadata::default());
    }

    let origin = origin_dir(path)?;

    Ok(ElfMetadata {
        needed: elf.libraries.iter().map(|s| s.to_string()).collect(),
        rpath: split_search_path(&elf.rpaths, &origin),
        runpath: split_search_path(&elf.runpaths, &origin),
    })
}

/// Directory `$ORIGIN` stands for: the parent of the binary's real path.
fn origin_dir(path: &Path) -> Result<PathBuf> {
    let real = fs::canonicalize(path).map_err(|e| Error::from_io(path, e))?;
    Ok(real
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}

fn split_search_path(entries: &[&str], origin: &Path) -> Vec<PathBuf> {
    entries
        .iter()
        .flat_map(|entry| entry.split(':'))
        .filter(|dir| !dir.is_empty())
        .map(|dir| expand_origin(dir, origin))
        .collect()
}

/// Substitute `$ORIGIN` / `${ORIGIN}` in a search directory.
///
/// `$LIB` and `$PLATFORM` are left untouched.
pub fn expand_origin(dir: &str, origin: &Path) -> PathBuf {
    let origin = origin.to_string_lossy();
    let expanded = dir
        .replace("${ORIGIN}", &origin)
        .replace("$ORIGIN", &origin);
    PathBuf::from(expanded).clean()
}
