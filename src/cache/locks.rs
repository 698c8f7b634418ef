//! Per-key mutual exclusion
//!
//! Serializes cache populates for the same key while letting different keys
//! run in parallel. The shared map is only held long enough to insert or
//! remove a key, never while the caller works.

use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;

/// Set of keys currently being populated
#[derive(Debug, Default)]
pub struct KeyedLocks {
    in_flight: Mutex<HashSet<String>>,
    released: Condvar,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no one else holds `key`, then hold it
    pub fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mut in_flight = self.in_flight.lock();
        let mut waited = false;
        while in_flight.contains(key) {
            waited = true;
            self.released.wait(&mut in_flight);
        }
        in_flight.insert(key.to_string());

        KeyGuard {
            owner: self,
            key: key.to_string(),
            waited,
        }
    }

    /// Number of keys currently held
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Held key; released on drop
#[derive(Debug)]
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    waited: bool,
}

impl KeyGuard<'_> {
    /// True if another holder had the key when this guard was requested
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.owner.in_flight.lock().remove(&self.key);
        // Waiters on other keys wake too and go back to sleep
        self.owner.released.notify_all();
    }
}
