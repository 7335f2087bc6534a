use thiserror::Error;

/// Failures of the cipher engine, key generation, and link codec.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD tag verification failed. No plaintext is ever released on this
    /// path; the ciphertext is corrupted or was tampered with.
    #[error("ciphertext authentication failed")]
    Authentication,

    #[error("encryption failed")]
    Encrypt,

    /// Ciphertext framing is structurally broken (too short, bad chunk
    /// length prefix) before any tag check could run.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The link fragment is missing, has the wrong segment count, or decodes
    /// to the wrong byte length. Never proceed with truncated key material.
    #[error("malformed share link: {0}")]
    MalformedLink(String),

    /// The OS random source is unavailable. Fatal; there is no fallback.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
}
