//! Share-link composition and parsing.
//!
//! Link format: `<base>/download/<identifier>#<base64url(key)>.<base64url(nonce)>`
//!
//! Everything after `#` is a URL fragment. Fragments are never included in
//! HTTP requests, which is the mechanism that keeps the relay blind: the
//! identifier routes the download, the fragment carries the key material,
//! and only the former ever reaches the wire. Any change to this format
//! that moves key material into the path or query breaks confidentiality.
//!
//! The `.` separator is guaranteed absent from the URL-safe base64 alphabet
//! (`A-Z a-z 0-9 - _`), so splitting on it is unambiguous.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::CryptoError;
use crate::material::{Nonce, SecretKey};
use crate::{KEY_SIZE, NONCE_SIZE};

/// Separator between the encoded key and nonce inside the fragment.
pub const FRAGMENT_SEPARATOR: char = '.';

/// Encode key and nonce into the fragment: `<key>.<nonce>`, base64url unpadded.
pub fn encode_fragment(key: &SecretKey, nonce: &Nonce) -> String {
    format!(
        "{}{FRAGMENT_SEPARATOR}{}",
        URL_SAFE_NO_PAD.encode(key.as_bytes()),
        URL_SAFE_NO_PAD.encode(nonce.as_bytes())
    )
}

/// Decode a fragment back into key material.
///
/// Requires exactly two segments decoding to exactly 32 and 12 bytes.
/// A missing separator, extra segments, wrong lengths, or invalid base64
/// all raise [`CryptoError::MalformedLink`]; truncated or padded material
/// is never accepted.
pub fn decode_fragment(fragment: &str) -> Result<(SecretKey, Nonce), CryptoError> {
    let segments: Vec<&str> = fragment.split(FRAGMENT_SEPARATOR).collect();
    let [key_part, nonce_part] = segments.as_slice() else {
        return Err(CryptoError::MalformedLink(format!(
            "expected 2 fragment segments, found {}",
            segments.len()
        )));
    };

    let key_bytes = decode_exact::<KEY_SIZE>(key_part, "key")?;
    let nonce_bytes = decode_exact::<NONCE_SIZE>(nonce_part, "nonce")?;

    Ok((
        SecretKey::from_bytes(key_bytes),
        Nonce::from_bytes(nonce_bytes),
    ))
}

fn decode_exact<const N: usize>(segment: &str, what: &str) -> Result<[u8; N], CryptoError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CryptoError::MalformedLink(format!("{what} segment is not base64url: {e}")))?;
    let len = decoded.len();
    decoded.try_into().map_err(|_| {
        CryptoError::MalformedLink(format!("{what} segment is {len} bytes (expected {N})"))
    })
}

/// Compose the full share link for an uploaded object.
pub fn compose_link(base_url: &str, identifier: &str, key: &SecretKey, nonce: &Nonce) -> String {
    format!(
        "{}/download/{identifier}#{}",
        base_url.trim_end_matches('/'),
        encode_fragment(key, nonce)
    )
}

/// Parse a share link into `(identifier, fragment)`.
///
/// The fragment is returned undecoded; pass it to [`decode_fragment`].
pub fn parse_link(url: &str) -> Result<(String, String), CryptoError> {
    let (locator, fragment) = url
        .split_once('#')
        .ok_or_else(|| CryptoError::MalformedLink("link has no '#' fragment".into()))?;

    if fragment.is_empty() {
        return Err(CryptoError::MalformedLink("link fragment is empty".into()));
    }

    let mut segments = locator.rsplit('/');
    let identifier = match segments.next() {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(CryptoError::MalformedLink(
                "link has no identifier segment".into(),
            ))
        }
    };
    if segments.next() != Some("download") {
        return Err(CryptoError::MalformedLink(
            "expected a /download/<identifier> path".into(),
        ));
    }

    Ok((identifier.to_string(), fragment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_material() -> (SecretKey, Nonce) {
        (
            SecretKey::from_bytes([0xA5; KEY_SIZE]),
            Nonce::from_bytes([0x5A; NONCE_SIZE]),
        )
    }

    #[test]
    fn test_fragment_roundtrip() {
        let (key, nonce) = test_material();
        let fragment = encode_fragment(&key, &nonce);
        let (key2, nonce2) = decode_fragment(&fragment).unwrap();
        assert_eq!(key, key2);
        assert_eq!(nonce, nonce2);
    }

    #[test]
    fn test_fragment_is_url_safe() {
        let (key, nonce) = test_material();
        let fragment = encode_fragment(&key, &nonce);
        assert!(fragment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
        assert_eq!(fragment.matches(FRAGMENT_SEPARATOR).count(), 1);
    }

    #[test]
    fn test_decode_missing_separator() {
        let result = decode_fragment("AAAAAAAAAAAAAAAAAAAAAA");
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_decode_extra_segments() {
        let (key, nonce) = test_material();
        let fragment = format!("{}.extra", encode_fragment(&key, &nonce));
        assert!(matches!(
            decode_fragment(&fragment),
            Err(CryptoError::MalformedLink(_))
        ));
    }

    #[test]
    fn test_decode_wrong_key_length() {
        // 16-byte key segment instead of 32
        let short_key = URL_SAFE_NO_PAD.encode([1u8; 16]);
        let nonce = URL_SAFE_NO_PAD.encode([2u8; NONCE_SIZE]);
        let result = decode_fragment(&format!("{short_key}.{nonce}"));
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_decode_wrong_nonce_length() {
        let key = URL_SAFE_NO_PAD.encode([1u8; KEY_SIZE]);
        let long_nonce = URL_SAFE_NO_PAD.encode([2u8; NONCE_SIZE + 1]);
        let result = decode_fragment(&format!("{key}.{long_nonce}"));
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let nonce = URL_SAFE_NO_PAD.encode([2u8; NONCE_SIZE]);
        let result = decode_fragment(&format!("!!!not-base64!!!.{nonce}"));
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_compose_parse_roundtrip() {
        let (key, nonce) = test_material();
        let link = compose_link("https://drop.example.com", "abc-123", &key, &nonce);
        assert_eq!(
            link,
            format!(
                "https://drop.example.com/download/abc-123#{}",
                encode_fragment(&key, &nonce)
            )
        );

        let (id, fragment) = parse_link(&link).unwrap();
        assert_eq!(id, "abc-123");
        let (key2, nonce2) = decode_fragment(&fragment).unwrap();
        assert_eq!(key, key2);
        assert_eq!(nonce, nonce2);
    }

    #[test]
    fn test_compose_trims_trailing_slash() {
        let (key, nonce) = test_material();
        let link = compose_link("https://drop.example.com/", "abc", &key, &nonce);
        assert!(link.starts_with("https://drop.example.com/download/abc#"));
    }

    #[test]
    fn test_parse_missing_fragment() {
        let result = parse_link("https://drop.example.com/download/abc-123");
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_parse_empty_fragment() {
        let result = parse_link("https://drop.example.com/download/abc-123#");
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_parse_missing_download_segment() {
        let result = parse_link("https://drop.example.com/abc-123#frag.ment");
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_parse_empty_identifier() {
        let result = parse_link("https://drop.example.com/download/#frag.ment");
        assert!(matches!(result, Err(CryptoError::MalformedLink(_))));
    }

    #[test]
    fn test_key_material_never_in_request_path() {
        let (key, nonce) = test_material();
        let link = compose_link("https://drop.example.com", "abc-123", &key, &nonce);
        let (locator, _) = link.split_once('#').unwrap();

        let key_b64 = URL_SAFE_NO_PAD.encode(key.as_bytes());
        let nonce_b64 = URL_SAFE_NO_PAD.encode(nonce.as_bytes());
        assert!(!locator.contains(&key_b64));
        assert!(!locator.contains(&nonce_b64));
    }
}
