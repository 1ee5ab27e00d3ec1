//! Token codec: joins a storage handle and key material into one URL-safe string.
//!
//! ```text
//! <handle>~<urlencode(base64(key || nonce || tag) with '+' -> '-')>
//! ```
//!
//! The format matches tokens issued by earlier deployments, so it must not change.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Separator between the handle and the encoded key material.
pub const SEPARATOR: char = '~';

/// Characters left unescaped by form-style URL encoding.
const KEY_MATERIAL_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Build a token from a storage handle and base64 key material.
pub fn encode(handle: &str, key_material: &str) -> String {
    let substituted = key_material.replace('+', "-");
    format!(
        "{handle}{SEPARATOR}{}",
        utf8_percent_encode(&substituted, KEY_MATERIAL_ESCAPES)
    )
}

/// Split a token back into `(handle, key_material)`.
///
/// Only the first separator is significant. A token without a separator yields
/// empty key material, which the cipher rejects as malformed.
pub fn decode(token: &str) -> (String, String) {
    match token.split_once(SEPARATOR) {
        Some((handle, encoded)) => {
            let key_material = percent_decode_str(encoded)
                .decode_utf8_lossy()
                .replace('-', "+");
            (handle.to_owned(), key_material)
        }
        None => (token.to_owned(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Chosen so the base64 contains '+', '/' and '=' padding.
    const KEY_MATERIAL: &str =
        "+/8AAQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyAhIiMkJSYnKCkqKywtLi8wMTIzNDU2Nzg5Og==";

    #[test]
    fn encode_substitutes_and_escapes() {
        let token = encode("abc123", KEY_MATERIAL);
        assert!(token.starts_with("abc123~-%2F8AAQ"));
        assert!(token.ends_with("Og%3D%3D"));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn decode_reverses_encode() {
        let token = encode("0f1e2d3c4b5a69788796a5b4c3d2e1f0", KEY_MATERIAL);
        let (handle, key_material) = decode(&token);
        assert_eq!(handle, "0f1e2d3c4b5a69788796a5b4c3d2e1f0");
        assert_eq!(key_material, KEY_MATERIAL);
    }

    #[test]
    fn decode_accepts_lowercase_escapes() {
        let (handle, key_material) = decode("h~-%2f8AAQ%3d%3d");
        assert_eq!(handle, "h");
        assert_eq!(key_material, "+/8AAQ==");
    }

    #[test]
    fn decode_without_separator_yields_empty_key_material() {
        let (handle, key_material) = decode("just-a-handle");
        assert_eq!(handle, "just-a-handle");
        assert!(key_material.is_empty());
    }

    #[test]
    fn decode_splits_on_first_separator_only() {
        let (handle, key_material) = decode("h~a~b");
        assert_eq!(handle, "h");
        assert_eq!(key_material, "a~b");
    }

    #[test]
    fn token_is_safe_in_a_path_segment() {
        let token = encode("handle", KEY_MATERIAL);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.!*()%~".contains(c)));
    }

    #[test]
    fn round_trip_with_real_key_material() {
        let (_, material) = crate::crypto::encrypt("x").unwrap();
        let encoded = material.to_base64();
        let (handle, decoded) = decode(&encode("handle", &encoded));
        assert_eq!(handle, "handle");
        assert_eq!(decoded, encoded);
    }
}
