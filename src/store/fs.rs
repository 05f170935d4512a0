//! Filesystem-backed memory files and shared directory plumbing.
//!
//! Every write goes through [`write_atomic`]: content lands in a sibling
//! temp file, is fsynced, then renamed over the target. Readers therefore
//! never observe a partially written memory, and a crash leaves either the
//! old file or the new one.

use crate::error::{CortexError, Result};
use crate::frontmatter;
use crate::model::Memory;
use crate::path::{CategoryPath, MemoryPath};
use crate::store::MemoryStore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `bytes` to `path` via sibling-temp + fsync + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CortexError::storage(
                path.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
    let tmp = path.with_file_name(format!(
        ".{file_name}.{}-{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    };
    write().map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CortexError::storage(path.to_path_buf(), e)
    })
}

/// Production [`MemoryStore`]: one markdown file per memory under the store
/// root, laid out by category directories.
pub struct FsMemoryStore {
    root: PathBuf,
}

impl FsMemoryStore {
    pub fn new(root: PathBuf) -> Self {
        FsMemoryStore { root }
    }

    fn file_path(&self, path: &MemoryPath) -> PathBuf {
        self.root.join(path.to_fs_path())
    }
}

impl MemoryStore for FsMemoryStore {
    fn load(&self, path: &MemoryPath) -> Result<Memory> {
        let file = self.file_path(path);
        let raw = match fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CortexError::MemoryNotFound {
                    path: path.to_string(),
                })
            }
            Err(e) => return Err(CortexError::storage(file, e)),
        };
        frontmatter::parse(&raw, &path.to_string())
    }

    fn exists(&self, path: &MemoryPath) -> Result<bool> {
        Ok(self.file_path(path).is_file())
    }

    fn add(&self, path: &MemoryPath, memory: &Memory) -> Result<()> {
        let file = self.file_path(path);
        if file.exists() {
            return Err(CortexError::MemoryAlreadyExists {
                path: path.to_string(),
            });
        }
        let raw = frontmatter::serialize(memory)?;
        write_atomic(&file, raw.as_bytes())
    }

    fn save(&self, path: &MemoryPath, memory: &Memory) -> Result<()> {
        let raw = frontmatter::serialize(memory)?;
        write_atomic(&self.file_path(path), raw.as_bytes())
    }

    fn remove(&self, path: &MemoryPath) -> Result<()> {
        let file = self.file_path(path);
        match fs::remove_file(&file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CortexError::storage(file, e)),
        }
    }

    fn rename(&self, src: &MemoryPath, dst: &MemoryPath) -> Result<()> {
        let src_file = self.file_path(src);
        let dst_file = self.file_path(dst);
        if !src_file.is_file() {
            return Err(CortexError::MemoryNotFound {
                path: src.to_string(),
            });
        }
        if dst_file.exists() {
            return Err(CortexError::MemoryAlreadyExists {
                path: dst.to_string(),
            });
        }
        if fs::rename(&src_file, &dst_file).is_ok() {
            return Ok(());
        }
        // Rename can fail across filesystems; fall back to copy + delete,
        // rolling back the copy if the delete fails.
        let raw = fs::read(&src_file).map_err(|e| CortexError::storage(src_file.clone(), e))?;
        write_atomic(&dst_file, &raw)?;
        if let Err(e) = fs::remove_file(&src_file) {
            let _ = fs::remove_file(&dst_file);
            return Err(CortexError::storage(src_file, e));
        }
        Ok(())
    }
}

/// Directory-level category operations shared by both index layouts.
pub struct DirCategoryOps {
    root: PathBuf,
}

impl DirCategoryOps {
    pub fn new(root: PathBuf) -> Self {
        DirCategoryOps { root }
    }

    fn dir(&self, path: &CategoryPath) -> PathBuf {
        self.root.join(path.to_fs_path())
    }

    pub fn exists(&self, path: &CategoryPath) -> Result<bool> {
        Ok(self.dir(path).is_dir())
    }

    /// Create the directory chain; returns true when the leaf was created.
    pub fn ensure(&self, path: &CategoryPath) -> Result<bool> {
        let dir = self.dir(path);
        if dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&dir).map_err(|e| CortexError::storage(dir, e))?;
        Ok(true)
    }

    /// A category is empty when it holds no memories and no subcategories.
    /// Index artifacts and hidden files do not count.
    pub fn is_empty(&self, path: &CategoryPath) -> Result<bool> {
        let dir = self.dir(path);
        if !dir.is_dir() {
            return Ok(true);
        }
        let entries = fs::read_dir(&dir).map_err(|e| CortexError::storage(dir.clone(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CortexError::storage(dir.clone(), e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_index_artifact(&name) || name.starts_with('.') {
                continue;
            }
            let kind = entry
                .file_type()
                .map_err(|e| CortexError::storage(entry.path(), e))?;
            if kind.is_dir() || name.ends_with(".md") {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn delete(&self, path: &CategoryPath, recursive: bool) -> Result<()> {
        if path.is_root() {
            return Err(CortexError::RootCategory { action: "deleted" });
        }
        let dir = self.dir(path);
        if !dir.is_dir() {
            return Err(CortexError::CategoryNotFound {
                path: path.to_string(),
            });
        }
        if !recursive && !self.is_empty(path)? {
            return Err(CortexError::CategoryNotEmpty {
                path: path.to_string(),
            });
        }
        fs::remove_dir_all(&dir).map_err(|e| CortexError::storage(dir, e))
    }
}

/// Files the index layouts own; never counted as store content.
pub fn is_index_artifact(name: &str) -> bool {
    matches!(name, "cortex.db" | "cortex.db-wal" | "cortex.db-shm" | "index.yaml")
        || name.ends_with(".tmp")
}
