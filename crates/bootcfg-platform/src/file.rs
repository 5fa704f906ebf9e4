//! File store implementations

use crate::{FileStore, PlatformError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Files stored under a root directory (the SD card root on device).
#[derive(Debug, Clone)]
pub struct DirFileStore {
    root: PathBuf,
}

impl DirFileStore {
    /// Create a store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a file in the store
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl FileStore for DirFileStore {
    fn read(&mut self, name: &str, max_len: usize) -> Result<Vec<u8>> {
        let path = self.path_of(name);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlatformError::NotFound(name.to_string()));
            }
            Err(e) => return Err(PlatformError::Io(e)),
        };

        // One byte past the limit tells a full buffer from an oversized file
        let mut data = Vec::with_capacity(max_len.min(64 * 1024));
        file.take(max_len as u64 + 1).read_to_end(&mut data)?;
        if data.len() > max_len {
            return Err(PlatformError::TooLarge {
                name: name.to_string(),
                max: max_len,
            });
        }

        tracing::debug!("Read {} bytes from {:?}", data.len(), path);
        Ok(data)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename (atomic on most systems)
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Wrote {} bytes to {:?}", data.len(), path);
        Ok(())
    }
}

/// In-memory file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: HashMap<String, Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryFileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one file
    pub fn with_file(name: &str, data: impl Into<Vec<u8>>) -> Self {
        let mut store = Self::new();
        store.insert(name, data);
        store
    }

    /// Insert or replace a file without counting it as a write
    pub fn insert(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(name.to_string(), data.into());
    }

    /// Contents of a file, if present
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl FileStore for MemoryFileStore {
    fn read(&mut self, name: &str, max_len: usize) -> Result<Vec<u8>> {
        let data = self
            .files
            .get(name)
            .ok_or_else(|| PlatformError::NotFound(name.to_string()))?;
        if data.len() > max_len {
            return Err(PlatformError::TooLarge {
                name: name.to_string(),
                max: max_len,
            });
        }
        Ok(data.clone())
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(PlatformError::Io(std::io::Error::other(
                "write rejected by store",
            )));
        }
        self.files.insert(name.to_string(), data.to_vec());
        self.writes += 1;
        Ok(())
    }
}
