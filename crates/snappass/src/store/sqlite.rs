//! [`SqliteStore`]: durable secret storage in an embedded SQLite database.
//!
//! # Schema
//!
//! ```text
//! Secret(Key TEXT PRIMARY KEY, CreatedAt TEXT, ExpiresAt TEXT, EncryptedPassword TEXT)
//! ```
//!
//! Expiry is precomputed at insert time, so reads never recompute a TTL.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::TimeToLive;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, error};

use super::{
    warn_empty_key, warn_expired, warn_unknown_key, Clock, SecretRecord, SecretStore, StoreError,
    TimestampCodec,
};

const BACKEND: &str = "sqlite";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS Secret (
        Key TEXT PRIMARY KEY,
        CreatedAt TEXT NOT NULL,
        ExpiresAt TEXT NOT NULL,
        EncryptedPassword TEXT NOT NULL
    );
"#;

/// How long a writer waits on a lock held by another connection to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`SecretStore`].
///
/// The connection sits behind a mutex and every retrieve runs its select and
/// delete inside one `BEGIN IMMEDIATE` transaction, so two readers can never
/// both observe the same row.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    codec: Box<dyn TimestampCodec>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(
        path: &Path,
        clock: Arc<dyn Clock>,
        codec: Box<dyn TimestampCodec>,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::with_connection(conn, clock, codec)
    }

    /// Open a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory(
        clock: Arc<dyn Clock>,
        codec: Box<dyn TimestampCodec>,
    ) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, clock, codec)
    }

    /// Wrap an existing connection, creating the `Secret` table if absent.
    pub fn with_connection(
        conn: Connection,
        clock: Arc<dyn Clock>,
        codec: Box<dyn TimestampCodec>,
    ) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            codec,
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("SQLite connection poisoned".to_string()))
    }

    /// Delete `key`, sweeping every other row whose expiry has passed as well.
    fn remove(&self, tx: &Transaction<'_>, key: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let deleted = tx.execute(
            "DELETE FROM Secret WHERE Key = ?1 OR ExpiresAt < ?2",
            params![key, self.codec.format(now)],
        )?;
        if deleted > 1 {
            debug!(swept = deleted - 1, "removed expired secrets");
        }
        Ok(())
    }

    fn decode_record(
        &self,
        key: &str,
        created_at: &str,
        expires_at: &str,
        ciphertext: String,
    ) -> Result<SecretRecord, StoreError> {
        let parse = |raw: &str, column: &str| {
            self.codec.parse(raw).map_err(|e| StoreError::CorruptState {
                key: key.to_owned(),
                reason: format!("{column} [{raw}]: {e}"),
            })
        };
        Ok(SecretRecord {
            key: key.to_owned(),
            created_at: parse(created_at, "CreatedAt")?,
            expires_at: parse(expires_at, "ExpiresAt")?,
            ciphertext,
        })
    }
}

impl SecretStore for SqliteStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn has(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let exists = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM Secret WHERE Key = ?1)",
            [key],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn store(&self, ciphertext: &str, key: &str, ttl: TimeToLive) -> Result<(), StoreError> {
        let record = SecretRecord::new(key, ciphertext, ttl, self.clock.now());
        let conn = self.lock_conn()?;
        let inserted = conn.execute(
            "INSERT INTO Secret (Key, CreatedAt, ExpiresAt, EncryptedPassword)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.key,
                self.codec.format(record.created_at),
                self.codec.format(record.expires_at),
                record.ciphertext,
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateHandle(key.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        if key.is_empty() {
            warn_empty_key(BACKEND);
            return Ok(None);
        }

        let now = self.clock.now();
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row = tx
            .query_row(
                "SELECT CreatedAt, ExpiresAt, EncryptedPassword FROM Secret WHERE Key = ?1",
                [key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((created_at, expires_at, ciphertext)) = row else {
            tx.commit()?;
            warn_unknown_key(BACKEND, key);
            return Ok(None);
        };

        // Delete before deciding what to return: a failed commit must never
        // leave a delivered row behind.
        self.remove(&tx, key, now)?;
        tx.commit()?;
        drop(conn);

        let record = match self.decode_record(key, &created_at, &expires_at, ciphertext) {
            Ok(record) => record,
            Err(e) => {
                error!(backend = BACKEND, key, error = %e, "discarded unreadable secret");
                return Ok(None);
            }
        };

        if record.is_expired(now) {
            warn_expired(BACKEND, &record);
            return Ok(None);
        }
        Ok(Some(record.ciphertext))
    }
}
