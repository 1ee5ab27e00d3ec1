//! Read-once, TTL-bounded storage of encrypted secrets.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process map, lost on restart. The default.
//! - [`SqliteStore`]: durable `Secret` table in an embedded SQLite file.
//!
//! Both implement [`SecretStore`] with identical observable behaviour; the
//! backend is chosen once at startup from configuration.
//!
//! # Store invariants
//!
//! - A record is returned by [`SecretStore::retrieve`] **at most once**. The
//!   delete happens before the ciphertext is handed back, under the same lock
//!   or transaction as the read.
//! - An expired record is never returned; finding one deletes it.
//! - Stores only ever hold ciphertext. Key material is never passed in.

pub mod clock;
pub mod memory;
pub mod sqlite;
pub mod timestamp;

pub use clock::{Clock, SystemClock};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use timestamp::{SqlDateTime, TimestampCodec};

use chrono::{DateTime, SubsecRound, Utc};
use common::TimeToLive;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Errors produced by the storage layer.
///
/// Not-found and expired are not errors: [`SecretStore::retrieve`] returns
/// `Ok(None)` for both.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this handle already exists. Never overwritten.
    #[error("duplicate storage handle: {0}")]
    DuplicateHandle(String),

    /// A persisted value could not be decoded.
    #[error("corrupt stored state for key [{key}]: {reason}")]
    CorruptState { key: String, reason: String },

    /// The backend itself failed (I/O, SQL error, poisoned lock).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// One stored secret: ciphertext plus expiry metadata.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub key: String,
    /// Base64 AES-GCM ciphertext, without tag.
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SecretRecord {
    /// Build a record created at `now` that expires after `ttl`.
    ///
    /// Times are truncated to whole seconds so both backends agree on the
    /// exact expiry instant.
    pub fn new(key: &str, ciphertext: &str, ttl: TimeToLive, now: DateTime<Utc>) -> Self {
        let created_at = now.trunc_subsecs(0);
        Self {
            key: key.to_owned(),
            ciphertext: ciphertext.to_owned(),
            created_at,
            expires_at: created_at + ttl_duration(ttl),
        }
    }

    /// A record is expired strictly after its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Lifetime policy shared by every backend. `Month` is a fixed 5208 hours.
pub fn ttl_duration(ttl: TimeToLive) -> chrono::Duration {
    chrono::Duration::hours(ttl.hours())
}

/// Mint a fresh, collision-resistant storage handle.
///
/// 32 lowercase hex characters; never contains the token separator.
pub fn mint_handle() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Storage capability shared by the volatile and durable backends.
pub trait SecretStore: Send + Sync {
    /// Short backend name for health output and logs.
    fn backend(&self) -> &'static str;

    /// Returns `true` if a record with this handle exists.
    ///
    /// Does not evict or check expiry; only [`SecretStore::retrieve`] decides
    /// whether a record is still deliverable.
    fn has(&self, key: &str) -> Result<bool, StoreError>;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateHandle`] if `key` is already present.
    fn store(&self, ciphertext: &str, key: &str, ttl: TimeToLive) -> Result<(), StoreError>;

    /// Consume the record for `key`.
    ///
    /// Returns the ciphertext the first time a live record is retrieved, and
    /// `None` for an empty key, an unknown key, or an expired record. Every
    /// call that finds a record deletes it.
    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `ciphertext` under a freshly minted handle and return the handle.
    fn put(&self, ciphertext: &str, ttl: TimeToLive) -> Result<String, StoreError> {
        let key = mint_handle();
        self.store(ciphertext, &key, ttl)?;
        Ok(key)
    }
}

// ---------------------------------------------------------------------------
// Shared retrieve logging
// ---------------------------------------------------------------------------

fn warn_empty_key(backend: &'static str) {
    warn!(backend, "tried to retrieve secret with an empty key");
}

fn warn_unknown_key(backend: &'static str, key: &str) {
    warn!(backend, key, "tried to retrieve secret for unknown key");
}

fn warn_expired(backend: &'static str, record: &SecretRecord) {
    warn!(
        backend,
        key = %record.key,
        created_at = %record.created_at,
        expires_at = %record.expires_at,
        "tried to retrieve secret after it expired"
    );
}
