//! vdrop-relay: sender/receiver orchestration against a blind relay.
//!
//! Send: generate key material → encrypt locally → upload ciphertext by an
//! unguessable identifier → compose the share link. Receive: parse the link
//! → download ciphertext → verify and decrypt locally.
//!
//! The relay transport only ever carries `(identifier, ciphertext, declared
//! content type)`. Key material lives in the link fragment, which is
//! composed and parsed on this side and never handed to the transport.

pub mod client;
pub mod transport;

pub use client::{ReceivedObject, RelayClient, SealedUpload};
pub use transport::{HttpTransport, RelayTransport, StoreTransport};
