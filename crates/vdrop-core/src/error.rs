use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

/// Failure taxonomy shared by the relay client, storage tier, and daemon.
///
/// User-facing surfaces (HTTP responses, CLI output) must render these
/// generically; the concrete cause goes to the tracing log only.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("ciphertext authentication failed: the file is corrupted or was tampered with")]
    Authentication,

    #[error("malformed share link: {0}")]
    MalformedLink(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("backing store error: {0}")]
    BackingStore(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// True for failures the caller can fix by correcting the request
    /// (as opposed to storage-side or transport trouble).
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::PayloadTooLarge { .. }
                | Self::MalformedLink(_)
                | Self::Authentication
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_message() {
        let err = RelayError::PayloadTooLarge {
            size: 2048,
            limit: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_client_fault_classification() {
        assert!(RelayError::Validation("bad id".into()).is_client_fault());
        assert!(RelayError::Authentication.is_client_fault());
        assert!(!RelayError::BackingStore("boom".into()).is_client_fault());
        assert!(!RelayError::NotFound("abc".into()).is_client_fault());
    }

    #[test]
    fn test_authentication_message_is_generic() {
        // No key material, offsets, or cipher internals in the message
        let msg = RelayError::Authentication.to_string();
        assert!(msg.contains("corrupted or was tampered with"));
    }
}
