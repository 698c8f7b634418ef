// Cache module

pub mod backend;
pub mod error;
pub mod key;
pub mod locks;
pub mod stats;
pub mod store;


pub use backend::{DiskBackend, FsBackend};
pub use error::CacheError;
pub use key::{derive_key, source_extension, CacheKey};
pub use locks::{KeyGuard, KeyedLocks};
pub use stats::{CacheStats, StoreCounters};
pub use store::{CacheLookup, CacheStatus, CacheStore};
