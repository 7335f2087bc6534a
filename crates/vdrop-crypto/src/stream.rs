//! Chunked AES-256-GCM for bounded-memory encryption of large payloads.
//!
//! Encrypted stream format (binary):
//! ```text
//! repeat: [4 bytes BE: record length][record ciphertext + 16-byte tag]
//! nonce(i) = base_nonce with its last 8 bytes XOR chunk index (BE)
//! AAD(i)   = chunk index (8 bytes BE) || is_final flag (1 byte)
//! ```
//!
//! Each chunk gets a distinct nonce derived deterministically from the base
//! nonce, so the link still carries a single (key, nonce) pair. The AAD
//! binds every chunk to its position and marks the final chunk, so chunk
//! reordering, substitution, and truncation all fail authentication.
//!
//! The single-buffer form in [`crate::aead`] remains the baseline relay
//! protocol; this variant is for callers that must bound peak memory.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm,
};

use crate::error::CryptoError;
use crate::material::{Nonce, SecretKey};
use crate::{NONCE_SIZE, TAG_SIZE};

/// Plaintext bytes per chunk (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Derive the nonce for chunk `index` from the base nonce.
fn derive_chunk_nonce(base: &Nonce, index: u64) -> Nonce {
    let mut bytes = *base.as_bytes();
    let counter = index.to_be_bytes();
    for (b, c) in bytes[NONCE_SIZE - 8..].iter_mut().zip(counter) {
        *b ^= c;
    }
    Nonce::from_bytes(bytes)
}

fn build_aad(index: u64, is_final: bool) -> [u8; 9] {
    let mut aad = [0u8; 9];
    aad[..8].copy_from_slice(&index.to_be_bytes());
    aad[8] = u8::from(is_final);
    aad
}

/// Encrypt a buffer as a sequence of independently authenticated chunks.
///
/// An empty plaintext still produces one (empty) authenticated chunk, so
/// every stream carries at least one tag.
pub fn encrypt_chunked(
    plaintext: &[u8],
    key: &SecretKey,
    base_nonce: &Nonce,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let chunks: Vec<&[u8]> = if plaintext.is_empty() {
        vec![&[]]
    } else {
        plaintext.chunks(CHUNK_SIZE).collect()
    };

    let mut out = Vec::with_capacity(plaintext.len() + chunks.len() * (LEN_PREFIX + TAG_SIZE));
    for (index, chunk) in chunks.iter().enumerate() {
        let index = index as u64;
        let is_final = index == chunks.len() as u64 - 1;
        let nonce = derive_chunk_nonce(base_nonce, index);
        let aad = build_aad(index, is_final);

        let record = cipher
            .encrypt(
                aes_gcm::Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: chunk,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::Encrypt)?;

        out.extend_from_slice(&(record.len() as u32).to_be_bytes());
        out.extend_from_slice(&record);
    }
    Ok(out)
}

/// Decrypt a chunked stream produced by [`encrypt_chunked`].
///
/// All-or-nothing: a framing defect or any failed tag discards everything.
pub fn decrypt_chunked(
    data: &[u8],
    key: &SecretKey,
    base_nonce: &Nonce,
) -> Result<Vec<u8>, CryptoError> {
    if data.is_empty() {
        return Err(CryptoError::MalformedCiphertext(
            "chunked stream is empty".into(),
        ));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let mut out = Vec::new();
    let mut cursor = 0usize;
    let mut index = 0u64;

    while cursor < data.len() {
        let Some(prefix) = data.get(cursor..cursor + LEN_PREFIX) else {
            return Err(CryptoError::MalformedCiphertext(
                "chunk length prefix is cut short".into(),
            ));
        };
        let record_len = u32::from_be_bytes(prefix.try_into().map_err(|_| {
            CryptoError::MalformedCiphertext("chunk length prefix is cut short".into())
        })?) as usize;
        cursor += LEN_PREFIX;

        if record_len < TAG_SIZE {
            return Err(CryptoError::MalformedCiphertext(format!(
                "chunk record of {record_len} bytes is below the tag size"
            )));
        }
        let Some(record) = data.get(cursor..cursor + record_len) else {
            return Err(CryptoError::MalformedCiphertext(
                "chunk record extends past the end of the stream".into(),
            ));
        };
        cursor += record_len;

        let is_final = cursor == data.len();
        let nonce = derive_chunk_nonce(base_nonce, index);
        let aad = build_aad(index, is_final);

        let plaintext = cipher
            .decrypt(
                aes_gcm::Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: record,
                    aad: &aad,
                },
            )
            .map_err(|_| CryptoError::Authentication)?;

        out.extend_from_slice(&plaintext);
        index += 1;
    }

    Ok(out)
}
