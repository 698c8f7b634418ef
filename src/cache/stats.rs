//! Cache statistics types
//!
//! - `StoreCounters`: lock-free counters updated on every lookup
//! - `CacheStats`: point-in-time snapshot for logging and the stats endpoint

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from an existing entry
    pub hits: u64,
    /// Lookups that ran the populate function
    pub misses: u64,
    /// Lookups that waited for a concurrent populate of the same key
    pub coalesced: u64,
    /// Populates that failed (nothing written)
    pub populate_failures: u64,
    /// Total bytes written to the cache directory
    pub bytes_written: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total lookups)
    /// Returns 0.0 if there are no lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    populate_failures: AtomicU64,
    bytes_written: AtomicU64,
}

impl StoreCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, bytes_written: usize) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(bytes_written as u64, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_populate_failure(&self) {
        self.populate_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            populate_failures: self.populate_failures.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}
