//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::secrets::SecretService;
use crate::store::{MemoryStore, SystemClock};

/// Application state shared across all request handlers.
///
/// Cheaply cloneable: the service holds its store behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub secrets: SecretService,
    /// Upper bound on a shared secret, in UTF-8 bytes.
    pub max_secret_bytes: usize,
}

impl AppState {
    pub fn new(secrets: SecretService, max_secret_bytes: usize) -> Self {
        Self {
            secrets,
            max_secret_bytes,
        }
    }
}

impl Default for AppState {
    /// Creates an [`AppState`] over an empty in-memory store, suitable for tests.
    fn default() -> Self {
        let store = MemoryStore::new(Arc::new(SystemClock));
        Self::new(SecretService::new(Arc::new(store)), 64 * 1024)
    }
}
