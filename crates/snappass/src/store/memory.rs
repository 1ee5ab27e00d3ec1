//! [`MemoryStore`]: volatile, process-local secret storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use common::TimeToLive;

use super::{warn_empty_key, warn_expired, warn_unknown_key, Clock, SecretRecord, SecretStore, StoreError};

const BACKEND: &str = "memory";

/// In-memory map from handle to [`SecretRecord`].
///
/// One mutex guards the whole map, so the check-read-delete sequence in
/// [`SecretStore::retrieve`] is atomic across threads. Contention is expected
/// to be low: every operation is a single hash lookup.
#[derive(Clone)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, SecretRecord>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of records currently held, expired or not.
    #[cfg(test)]
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SecretRecord>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl SecretStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(key))
    }

    fn store(&self, ciphertext: &str, key: &str, ttl: TimeToLive) -> Result<(), StoreError> {
        let record = SecretRecord::new(key, ciphertext, ttl, self.clock.now());
        let mut items = self.lock()?;
        if items.contains_key(key) {
            return Err(StoreError::DuplicateHandle(key.to_owned()));
        }
        items.insert(key.to_owned(), record);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        if key.is_empty() {
            warn_empty_key(BACKEND);
            return Ok(None);
        }

        let now = self.clock.now();
        // Removing under the lock is both the read and the delete.
        let Some(record) = self.lock()?.remove(key) else {
            warn_unknown_key(BACKEND, key);
            return Ok(None);
        };

        if record.is_expired(now) {
            warn_expired(BACKEND, &record);
            return Ok(None);
        }
        Ok(Some(record.ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::clock::ManualClock;

    fn store_with_clock() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::at_noon();
        (MemoryStore::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn initially_empty() {
        let (store, _) = store_with_clock();
        assert_eq!(store.len().unwrap(), 0);
        assert!(!store.has("anything").unwrap());
    }

    #[test]
    fn expired_records_stay_until_accessed() {
        let (store, clock) = store_with_clock();
        store.store("c", "k", TimeToLive::Hour).unwrap();
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.retrieve("k").unwrap(), None);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn clones_share_state() {
        let (store, _) = store_with_clock();
        let other = store.clone();
        store.store("c", "k", TimeToLive::Hour).unwrap();
        assert_eq!(other.retrieve("k").unwrap().as_deref(), Some("c"));
        assert_eq!(store.retrieve("k").unwrap(), None);
    }

    #[test]
    fn other_records_untouched_by_retrieve() {
        let (store, _) = store_with_clock();
        store.store("a", "ka", TimeToLive::Hour).unwrap();
        store.store("b", "kb", TimeToLive::Hour).unwrap();
        store.retrieve("ka").unwrap();
        assert!(store.has("kb").unwrap());
    }
}
