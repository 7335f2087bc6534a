//! vdrop-crypto: sender-side encryption for VeilDrop
//!
//! The relay only ever sees ciphertext; key material travels inside the
//! share link's URL fragment and never reaches the wire.
//!
//! Pipeline: plaintext → AES-256-GCM encrypt → upload ciphertext → share
//! `<base>/download/<id>#<base64url(key)>.<base64url(nonce)>`
//!
//! Ciphertext format (single-buffer): `[N bytes: ciphertext][16 bytes: GCM tag]`
//!
//! The chunked variant in [`stream`] derives one nonce per chunk from the
//! base nonce and binds the chunk index into the AAD; see its module docs.

pub mod aead;
pub mod error;
pub mod link;
pub mod material;
pub mod stream;

pub use aead::{decrypt, encrypt};
pub use error::CryptoError;
pub use link::{compose_link, decode_fragment, encode_fragment, parse_link};
pub use material::{Nonce, SecretKey};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
