//! Shared test utilities for appdeploy tests.
//!
//! [`ElfBuilder`] writes minimal ELF64 little-endian shared objects with a
//! dynamic section, enough for the metadata reader and resolver to work on
//! without a compiler in the test environment.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use appdeploy::ldconfig::LdconfigCache;
use appdeploy::resolve::canonical_path;
use appdeploy::DependencyResolver;

const EHDR_SIZE: usize = 64;
const PHDR_SIZE: usize = 56;

const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;

const DT_NULL: u64 = 0;
const DT_NEEDED: u64 = 1;
const DT_STRTAB: u64 = 5;
const DT_STRSZ: u64 = 10;
const DT_RPATH: u64 = 15;
const DT_RUNPATH: u64 = 29;

/// Builder for synthetic ELF objects.
#[derive(Debug, Clone, Default)]
pub struct ElfBuilder {
    needed: Vec<String>,
    rpath: Option<String>,
    runpath: Option<String>,
    is_static: bool,
}

impl ElfBuilder {
    /// Dynamically linked object with no dependencies yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Object without a dynamic section.
    pub fn static_binary() -> Self {
        Self {
            is_static: true,
            ..Self::default()
        }
    }

    pub fn needed(mut self, name: &str) -> Self {
        self.needed.push(name.to_string());
        self
    }

    pub fn rpath(mut self, rpath: &str) -> Self {
        self.rpath = Some(rpath.to_string());
        self
    }

    pub fn runpath(mut self, runpath: &str) -> Self {
        self.runpath = Some(runpath.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        if self.is_static {
            let total = EHDR_SIZE + PHDR_SIZE;
            let mut out = elf_header(1);
            out.extend(program_header(PT_LOAD, 0, total as u64));
            return out;
        }

        let strtab_off = EHDR_SIZE + 2 * PHDR_SIZE;
        let mut strtab = vec![0u8];
        let mut add_str = |s: &str| {
            let offset = strtab.len() as u64;
            strtab.extend_from_slice(s.as_bytes());
            strtab.push(0);
            offset
        };

        let mut entries: Vec<(u64, u64)> = Vec::new();
        for name in &self.needed {
            entries.push((DT_NEEDED, add_str(name)));
        }
        if let Some(rpath) = &self.rpath {
            entries.push((DT_RPATH, add_str(rpath)));
        }
        if let Some(runpath) = &self.runpath {
            entries.push((DT_RUNPATH, add_str(runpath)));
        }
        entries.push((DT_STRTAB, strtab_off as u64));
        entries.push((DT_STRSZ, strtab.len() as u64));
        entries.push((DT_NULL, 0));

        let dyn_off = (strtab_off + strtab.len() + 7) & !7;
        let dyn_size = entries.len() * 16;
        let total = dyn_off + dyn_size;

        let mut out = elf_header(2);
        out.extend(program_header(PT_LOAD, 0, total as u64));
        out.extend(program_header(PT_DYNAMIC, dyn_off as u64, dyn_size as u64));
        out.extend(&strtab);
        out.resize(dyn_off, 0);
        for (tag, val) in entries {
            out.extend(tag.to_le_bytes());
            out.extend(val.to_le_bytes());
        }
        assert_eq!(out.len(), total);
        out
    }

    /// Write to `path` (parents created), mode 755.
    pub fn write(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir for ELF");
        }
        fs::write(path, self.build()).expect("Failed to write ELF");
        let mut perms = fs::metadata(path).expect("Failed to get metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("Failed to set permissions");
        path.to_path_buf()
    }
}

fn elf_header(phnum: u16) -> Vec<u8> {
    let mut h = Vec::with_capacity(EHDR_SIZE);
    // e_ident: magic, ELFCLASS64, ELFDATA2LSB, EV_CURRENT, padding
    h.extend([0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    h.extend([0u8; 8]);
    h.extend(3u16.to_le_bytes()); // ET_DYN
    h.extend(62u16.to_le_bytes()); // EM_X86_64
    h.extend(1u32.to_le_bytes());
    h.extend(0u64.to_le_bytes()); // e_entry
    h.extend((EHDR_SIZE as u64).to_le_bytes()); // e_phoff
    h.extend(0u64.to_le_bytes()); // e_shoff
    h.extend(0u32.to_le_bytes()); // e_flags
    h.extend((EHDR_SIZE as u16).to_le_bytes());
    h.extend((PHDR_SIZE as u16).to_le_bytes());
    h.extend(phnum.to_le_bytes());
    h.extend(64u16.to_le_bytes()); // e_shentsize
    h.extend(0u16.to_le_bytes()); // e_shnum
    h.extend(0u16.to_le_bytes()); // e_shstrndx
    assert_eq!(h.len(), EHDR_SIZE);
    h
}

/// Program header with vaddr == offset, so virtual addresses in the dynamic
/// section are file offsets.
fn program_header(p_type: u32, offset: u64, size: u64) -> Vec<u8> {
    let mut p = Vec::with_capacity(PHDR_SIZE);
    p.extend(p_type.to_le_bytes());
    p.extend(6u32.to_le_bytes()); // PF_R | PF_W
    p.extend(offset.to_le_bytes());
    p.extend(offset.to_le_bytes()); // p_vaddr
    p.extend(offset.to_le_bytes()); // p_paddr
    p.extend(size.to_le_bytes()); // p_filesz
    p.extend(size.to_le_bytes()); // p_memsz
    p.extend(8u64.to_le_bytes()); // p_align
    assert_eq!(p.len(), PHDR_SIZE);
    p
}

/// Scratch tree with a fake system library dir and an AppDir.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Root of the scratch tree, absolute and clean.
    pub root: PathBuf,
    /// Stands in for the system's default library directory.
    pub sys_lib: PathBuf,
    /// AppDir being assembled.
    pub app_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = canonical_path(temp_dir.path()).expect("Failed to canonicalize temp dir");
        let sys_lib = root.join("sys/lib");
        let app_dir = root.join("AppDir");

        fs::create_dir_all(&sys_lib).expect("Failed to create sys lib dir");
        fs::create_dir_all(&app_dir).expect("Failed to create AppDir");

        Self {
            _temp_dir: temp_dir,
            root,
            sys_lib,
            app_dir,
        }
    }

    /// Write a library into the fake system library dir.
    pub fn sys_library(&self, name: &str, elf: ElfBuilder) -> PathBuf {
        elf.write(&self.sys_lib.join(name))
    }

    /// Resolver whose only search location is the fake system dir.
    pub fn resolver(&self) -> DependencyResolver {
        DependencyResolver::with_search_context(
            Vec::new(),
            LdconfigCache::default(),
            vec![self.sys_lib.clone()],
        )
    }
}

/// Assert that a symlink exists and points to the expected target.
pub fn assert_symlink(path: &Path, expected_target: &Path) {
    assert!(
        path.is_symlink(),
        "Expected symlink at {}, but it's not a symlink",
        path.display()
    );

    let target = fs::read_link(path).expect("Failed to read symlink");
    assert_eq!(
        target, expected_target,
        "Symlink {} points to {:?}, expected {:?}",
        path.display(),
        target,
        expected_target
    );
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read file: {}", path.display()));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

/// File names of every regular file under `dir`, relative to it.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}
