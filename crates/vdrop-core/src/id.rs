//! Object identifiers for stored ciphertext blobs.
//!
//! An identifier is caller-chosen and must be globally unguessable; a random
//! UUID v4 (128 bits) is the default form. Identifiers are NOT secrets: they
//! may appear in URLs, logs, and referrers. Confidentiality rides entirely on
//! the fragment-carried key material.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// Maximum accepted identifier length in characters.
pub const MAX_ID_LEN: usize = 128;

/// An opaque, path-safe identifier for one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a fresh random identifier (UUID v4, 128 bits of randomness).
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate and wrap a caller-supplied identifier.
    ///
    /// Accepts ASCII alphanumerics, `-` and `_`, between 1 and
    /// [`MAX_ID_LEN`] characters. Anything else is a `Validation` error so
    /// identifiers stay safe to embed in URL paths and storage keys.
    pub fn parse(raw: &str) -> RelayResult<Self> {
        if raw.is_empty() {
            return Err(RelayError::Validation("identifier is empty".into()));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(RelayError::Validation(format!(
                "identifier too long: {} chars (limit {MAX_ID_LEN})",
                raw.len()
            )));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(RelayError::Validation(format!(
                "identifier contains invalid characters: {raw:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
