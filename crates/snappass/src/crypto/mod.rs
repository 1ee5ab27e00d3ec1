//! AES-256-GCM encryption primitives for shared secrets.
//!
//! This module is free of storage and HTTP dependencies. Every secret gets its
//! own random key; the key never reaches the store.
//!
//! # Key material format
//!
//! ```text
//! base64( key[32] || nonce[12] || tag[16] )
//! ```
//!
//! The ciphertext is the same length as the plaintext; the authentication tag
//! travels with the key inside the token, not with the ciphertext.

pub mod cipher;

pub use cipher::{decrypt, encrypt, CipherError, KeyMaterial};
