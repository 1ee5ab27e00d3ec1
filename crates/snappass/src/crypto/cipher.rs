//! AES-256-GCM encryption and decryption of a single secret string.
//!
//! **Split-key design:** the store only ever sees the ciphertext. The key,
//! nonce and detached tag are packed into [`KeyMaterial`] and handed back to
//! the caller, who embeds them in the token.

use aes_gcm::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Total length of serialized key material.
pub const KEY_MATERIAL_LEN: usize = KEY_LEN + NONCE_LEN + TAG_LEN;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key material or ciphertext is not valid base64 of the expected shape.
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    /// The tag did not verify: tampered ciphertext or the wrong key material.
    #[error("authentication failed")]
    Authentication,

    /// AES-GCM refused to encrypt (plaintext exceeds the AEAD length limit).
    #[error("aead operation failed")]
    AeadFailure,
}

/// Per-secret decryption material: key, nonce and detached tag.
///
/// Dropping a value overwrites the key with zeroes.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    nonce: [u8; NONCE_LEN],
    tag: [u8; TAG_LEN],
}

impl KeyMaterial {
    /// Encode as `base64(key || nonce || tag)`.
    pub fn to_base64(&self) -> String {
        let mut bytes = [0u8; KEY_MATERIAL_LEN];
        bytes[..KEY_LEN].copy_from_slice(&self.key);
        bytes[KEY_LEN..KEY_LEN + NONCE_LEN].copy_from_slice(&self.nonce);
        bytes[KEY_LEN + NONCE_LEN..].copy_from_slice(&self.tag);
        let encoded = STANDARD.encode(bytes);
        bytes.iter_mut().for_each(|b| *b = 0);
        encoded
    }

    /// Parse key material produced by [`KeyMaterial::to_base64`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedInput`] if the string is empty, is not
    /// base64, or does not decode to exactly [`KEY_MATERIAL_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CipherError> {
        if encoded.is_empty() {
            return Err(CipherError::MalformedInput("key material is empty"));
        }
        let mut bytes = STANDARD
            .decode(encoded)
            .map_err(|_| CipherError::MalformedInput("key material is not base64"))?;
        if bytes.len() != KEY_MATERIAL_LEN {
            bytes.iter_mut().for_each(|b| *b = 0);
            return Err(CipherError::MalformedInput("key material has wrong length"));
        }

        let mut material = Self {
            key: [0u8; KEY_LEN],
            nonce: [0u8; NONCE_LEN],
            tag: [0u8; TAG_LEN],
        };
        material.key.copy_from_slice(&bytes[..KEY_LEN]);
        material.nonce.copy_from_slice(&bytes[KEY_LEN..KEY_LEN + NONCE_LEN]);
        material.tag.copy_from_slice(&bytes[KEY_LEN + NONCE_LEN..]);
        bytes.iter_mut().for_each(|b| *b = 0);
        Ok(material)
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Encrypt `plaintext` under a freshly generated key and nonce.
///
/// Returns the base64 ciphertext (same byte length as the UTF-8 plaintext) and
/// the [`KeyMaterial`] needed to decrypt it. The OS CSPRNG panics if it cannot
/// supply entropy; that is not treated as recoverable.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] only if the plaintext exceeds the
/// AES-GCM message length limit.
pub fn encrypt(plaintext: &str) -> Result<(String, KeyMaterial), CipherError> {
    let mut material = KeyMaterial {
        key: [0u8; KEY_LEN],
        nonce: [0u8; NONCE_LEN],
        tag: [0u8; TAG_LEN],
    };
    OsRng.fill_bytes(&mut material.key);
    OsRng.fill_bytes(&mut material.nonce);

    let cipher = build_cipher(&material.key)?;
    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&material.nonce), b"", &mut buffer)
        .map_err(|_| CipherError::AeadFailure)?;

    // The tag only exists once encryption has completed.
    material.tag.copy_from_slice(tag.as_slice());

    Ok((STANDARD.encode(&buffer), material))
}

/// Verify and decrypt a base64 ciphertext with base64 key material.
///
/// # Errors
///
/// Returns [`CipherError::MalformedInput`] if either input is not valid base64
/// of the expected shape, or the verified plaintext is not UTF-8.
/// Returns [`CipherError::Authentication`] if the tag does not verify.
pub fn decrypt(ciphertext: &str, key_material: &str) -> Result<String, CipherError> {
    let material = KeyMaterial::from_base64(key_material)?;
    let mut buffer = STANDARD
        .decode(ciphertext)
        .map_err(|_| CipherError::MalformedInput("ciphertext is not base64"))?;

    let cipher = build_cipher(&material.key)?;
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&material.nonce),
            b"",
            &mut buffer,
            Tag::from_slice(&material.tag),
        )
        .map_err(|_| CipherError::Authentication)?;

    String::from_utf8(buffer).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.iter_mut().for_each(|b| *b = 0);
        CipherError::MalformedInput("plaintext is not UTF-8")
    })
}

fn build_cipher(key: &[u8; KEY_LEN]) -> Result<Aes256Gcm, CipherError> {
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::MalformedInput("invalid key length"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let (ciphertext, material) = encrypt("hello world").unwrap();
        let decrypted = decrypt(&ciphertext, &material.to_base64()).unwrap();
        assert_eq!(decrypted, "hello world");
    }

    #[test]
    fn round_trip_preserves_unicode_and_empty() {
        for plaintext in ["", "pässwörd 🔑", "line one\nline two\ttab"] {
            let (ciphertext, material) = encrypt(plaintext).unwrap();
            assert_eq!(decrypt(&ciphertext, &material.to_base64()).unwrap(), plaintext);
        }
    }

    #[test]
    fn ciphertext_has_plaintext_length() {
        let (ciphertext, _) = encrypt("123-45-6789").unwrap();
        assert_eq!(STANDARD.decode(ciphertext).unwrap().len(), 11);
    }

    #[test]
    fn key_material_is_fixed_size() {
        let (_, material) = encrypt("x").unwrap();
        let encoded = material.to_base64();
        assert_eq!(encoded.len(), 80);
        assert_eq!(STANDARD.decode(&encoded).unwrap().len(), KEY_MATERIAL_LEN);
    }

    #[test]
    fn fresh_key_per_secret() {
        let (c1, m1) = encrypt("same").unwrap();
        let (c2, m2) = encrypt("same").unwrap();
        assert_ne!(m1, m2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn wrong_key_material_fails_authentication() {
        let (ciphertext, _) = encrypt("secret").unwrap();
        let (_, other) = encrypt("secret").unwrap();
        assert!(matches!(
            decrypt(&ciphertext, &other.to_base64()),
            Err(CipherError::Authentication)
        ));
    }

    #[test]
    fn every_ciphertext_bit_flip_fails_authentication() {
        let (ciphertext, material) = encrypt("tamper me").unwrap();
        let raw = STANDARD.decode(&ciphertext).unwrap();
        let key = material.to_base64();
        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&STANDARD.encode(&tampered), &key);
                assert!(matches!(result, Err(CipherError::Authentication)));
            }
        }
    }

    #[test]
    fn every_key_material_bit_flip_fails() {
        let (ciphertext, material) = encrypt("tamper me").unwrap();
        let raw = STANDARD.decode(material.to_base64()).unwrap();
        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&ciphertext, &STANDARD.encode(&tampered));
                assert!(matches!(result, Err(CipherError::Authentication)));
            }
        }
    }

    #[test]
    fn empty_key_material_is_malformed() {
        let (ciphertext, _) = encrypt("x").unwrap();
        assert!(matches!(
            decrypt(&ciphertext, ""),
            Err(CipherError::MalformedInput(_))
        ));
    }

    #[test]
    fn short_key_material_is_malformed() {
        let (ciphertext, _) = encrypt("x").unwrap();
        let short = STANDARD.encode([0u8; 40]);
        assert!(matches!(
            decrypt(&ciphertext, &short),
            Err(CipherError::MalformedInput(_))
        ));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let (ciphertext, material) = encrypt("x").unwrap();
        assert!(matches!(
            decrypt(&ciphertext, "!!!not base64!!!"),
            Err(CipherError::MalformedInput(_))
        ));
        assert!(matches!(
            decrypt("%%%", &material.to_base64()),
            Err(CipherError::MalformedInput(_))
        ));
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let (_, material) = encrypt("x").unwrap();
        assert!(format!("{material:?}").contains("REDACTED"));
    }

    #[test]
    fn key_material_base64_round_trip() {
        let (_, material) = encrypt("x").unwrap();
        let parsed = KeyMaterial::from_base64(&material.to_base64()).unwrap();
        assert_eq!(parsed, material);
    }
}
