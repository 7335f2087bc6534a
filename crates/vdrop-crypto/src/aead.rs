//! Single-buffer AES-256-GCM encryption/decryption.
//!
//! Ciphertext format: `[N bytes: ciphertext][16 bytes: GCM tag]`
//!
//! Decryption is all-or-nothing: the tag is verified before a single
//! plaintext byte is released. This form holds the whole buffer in memory
//! and is bounded by the relay's configured maximum payload size; the
//! chunked variant in [`crate::stream`] bounds peak memory for large files.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};

use crate::error::CryptoError;
use crate::material::{Nonce, SecretKey};
use crate::TAG_SIZE;

/// Encrypt a plaintext buffer. Returns `ciphertext || tag`.
pub fn encrypt(plaintext: &[u8], key: &SecretKey, nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let gcm_nonce = aes_gcm::Nonce::from_slice(nonce.as_bytes());

    cipher
        .encrypt(gcm_nonce, plaintext)
        .map_err(|_| CryptoError::Encrypt)
}

/// Decrypt `ciphertext || tag`, verifying the tag.
///
/// Any corruption of ciphertext or tag fails with
/// [`CryptoError::Authentication`] and yields no plaintext.
pub fn decrypt(ciphertext: &[u8], key: &SecretKey, nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::MalformedCiphertext(format!(
            "ciphertext too short: {} bytes (minimum {TAG_SIZE})",
            ciphertext.len()
        )));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let gcm_nonce = aes_gcm::Nonce::from_slice(nonce.as_bytes());

    cipher
        .decrypt(gcm_nonce, ciphertext)
        .map_err(|_| CryptoError::Authentication)
}
