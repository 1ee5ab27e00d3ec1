//! Share and reveal: the cipher, token codec and store composed end to end.
//!
//! ```text
//! share:  encrypt(secret) -> put(ciphertext, ttl) -> encode(handle, key material)
//! reveal: decode(token) -> retrieve(handle) -> decrypt(ciphertext, key material)
//! ```

use std::sync::Arc;

use common::TimeToLive;
use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::{self, CipherError};
use crate::store::{SecretStore, StoreError};
use crate::token;

/// Errors from sharing or revealing a secret.
#[derive(Debug, Error)]
pub enum SecretsError {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cheaply cloneable front door to the configured [`SecretStore`].
#[derive(Clone)]
pub struct SecretService {
    store: Arc<dyn SecretStore>,
}

impl SecretService {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Name of the active storage backend.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Encrypt and store `secret`, returning the only token that can reveal it.
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError::Store`] if the record cannot be written.
    pub fn share(&self, secret: &str, ttl: TimeToLive) -> Result<String, SecretsError> {
        let (ciphertext, key_material) = crypto::encrypt(secret)?;
        let handle = self.store.put(&ciphertext, ttl)?;
        info!(key = %handle, %ttl, "secret stored");
        Ok(token::encode(&handle, &key_material.to_base64()))
    }

    /// Whether the record behind `token` still exists. Does not consume it.
    pub fn is_available(&self, token: &str) -> Result<bool, SecretsError> {
        let (handle, _) = token::decode(token);
        if handle.is_empty() {
            return Ok(false);
        }
        Ok(self.store.has(&handle)?)
    }

    /// Consume the record behind `token` and decrypt it.
    ///
    /// Returns `Ok(None)` when the record is unknown, expired or already read.
    /// The record is consumed even when decryption then fails.
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError::Cipher`] if the token's key material is
    /// malformed or does not authenticate the ciphertext.
    pub fn reveal(&self, token: &str) -> Result<Option<String>, SecretsError> {
        let (handle, key_material) = token::decode(token);
        let Some(ciphertext) = self.store.retrieve(&handle)? else {
            return Ok(None);
        };

        match crypto::decrypt(&ciphertext, &key_material) {
            Ok(secret) => {
                info!(key = %handle, "secret revealed");
                Ok(Some(secret))
            }
            Err(e) => {
                warn!(key = %handle, error = %e, "secret consumed but could not be decrypted");
                Err(e.into())
            }
        }
    }
}
