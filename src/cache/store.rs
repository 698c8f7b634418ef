//! Content-addressed cache store
//!
//! Entries live at `<cache_dir>/<key><extension>` and are never modified
//! after they are written. A lookup either returns the stored bytes or runs
//! the caller's populate function, persists its output and returns it.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::backend::{DiskBackend, FsBackend};
use super::error::CacheError;
use super::key::CacheKey;
use super::locks::KeyedLocks;
use super::stats::{CacheStats, StoreCounters};

/// Whether a lookup was served from an existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Result of `CacheStore::get_or_create`
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub bytes: Bytes,
    pub status: CacheStatus,
}

pub struct CacheStore {
    cache_dir: PathBuf,
    backend: Arc<dyn DiskBackend>,
    locks: KeyedLocks,
    counters: StoreCounters,
}

impl CacheStore {
    /// Store on the local filesystem
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_backend(cache_dir, Arc::new(FsBackend::new()))
    }

    pub fn with_backend(cache_dir: impl Into<PathBuf>, backend: Arc<dyn DiskBackend>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            backend,
            locks: KeyedLocks::new(),
            counters: StoreCounters::default(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Location of the entry addressed by `key` + `extension`
    pub fn entry_path(&self, key: &CacheKey, extension: &str) -> PathBuf {
        self.cache_dir.join(key.file_name(extension))
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Return the entry for `key`, creating it with `populate` on a miss
    ///
    /// Populates of the same address are serialized: a caller that waited
    /// for another populate re-reads the entry instead of recomputing it.
    /// If `populate` fails nothing is written and its error is returned.
    pub fn get_or_create<F, E>(
        &self,
        key: &CacheKey,
        extension: &str,
        populate: F,
    ) -> Result<CacheLookup, E>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: From<CacheError>,
    {
        let path = self.entry_path(key, extension);

        if let Some(bytes) = self.backend.read_file(&path)? {
            return Ok(self.hit(key, bytes));
        }

        let guard = self.locks.lock(&key.file_name(extension));
        if guard.waited() {
            self.counters.record_coalesced();
            // The holder we waited for has most likely written the entry
            if let Some(bytes) = self.backend.read_file(&path)? {
                return Ok(self.hit(key, bytes));
            }
        }

        let data = match populate() {
            Ok(data) => data,
            Err(e) => {
                self.counters.record_populate_failure();
                return Err(e);
            }
        };

        self.backend.create_dir_all(&self.cache_dir)?;
        self.backend.write_file_atomic(&path, &data)?;
        drop(guard);

        self.counters.record_miss(data.len());
        tracing::debug!(
            cache_key = %key,
            path = %path.display(),
            size_bytes = data.len(),
            "Cache entry created"
        );

        Ok(CacheLookup {
            bytes: Bytes::from(data),
            status: CacheStatus::Miss,
        })
    }

    fn hit(&self, key: &CacheKey, bytes: Bytes) -> CacheLookup {
        self.counters.record_hit();
        tracing::debug!(cache_key = %key, size_bytes = bytes.len(), "Cache hit");
        CacheLookup {
            bytes,
            status: CacheStatus::Hit,
        }
    }
}
