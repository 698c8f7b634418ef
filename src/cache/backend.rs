//! Backend trait for filesystem operations

use bytes::Bytes;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

use super::error::CacheError;

/// Abstraction over the filesystem so the store can be tested in memory
pub trait DiskBackend: Send + Sync {
    /// Read entire file contents, `None` if the file does not exist
    fn read_file(&self, path: &Path) -> Result<Option<Bytes>, CacheError>;

    /// Write file contents atomically (temp file + rename)
    ///
    /// Readers observe either no file or the complete file, never a prefix.
    fn write_file_atomic(&self, path: &Path, data: &[u8]) -> Result<(), CacheError>;

    /// Create directory and all parent directories; existing is not an error
    fn create_dir_all(&self, path: &Path) -> Result<(), CacheError>;
}

/// Local filesystem backend using std::fs
#[derive(Debug, Default, Clone, Copy)]
pub struct FsBackend;

impl FsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DiskBackend for FsBackend {
    fn read_file(&self, path: &Path) -> Result<Option<Bytes>, CacheError> {
        match std::fs::read(path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_file_atomic(&self, path: &Path, data: &[u8]) -> Result<(), CacheError> {
        let parent = path
            .parent()
            .ok_or_else(|| CacheError::persist(path, std::io::ErrorKind::InvalidInput.into()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("entry");

        // Unique per writer so concurrent writers never share a temp file
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let written = (|| {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
            std::fs::rename(&temp_path, path)
        })();

        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(CacheError::persist(path, e));
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }
}
