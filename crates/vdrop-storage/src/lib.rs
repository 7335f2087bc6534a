//! vdrop-storage: blind relay storage tier.
//!
//! The store persists and returns opaque ciphertext blobs by identifier. It
//! never decrypts, inspects, parses, or re-encodes payload bytes; the
//! declared content type is carried as unverified metadata. Key material
//! never reaches this crate.

pub mod operator;
pub mod store;

pub use operator::{build_operator, S3Credentials};
pub use store::BlindStore;
