//! Send/receive orchestration: encrypt → upload → link, link → download → decrypt.

use tracing::{debug, info};
use vdrop_core::{ObjectId, RelayError, RelayResult};
use vdrop_crypto::{compose_link, decode_fragment, parse_link, CryptoError, Nonce, SecretKey};

use crate::transport::RelayTransport;

/// Result of a successful send: where the ciphertext lives and the one link
/// that can open it.
#[derive(Debug)]
pub struct SealedUpload {
    pub id: ObjectId,
    pub link: String,
}

/// A received and decrypted object.
#[derive(Debug)]
pub struct ReceivedObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Client-side orchestrator for one relay endpoint.
///
/// Operations within one transfer are strictly sequential: encryption
/// completes before the upload starts, and the download completes before
/// decryption starts. Distinct transfers share nothing.
pub struct RelayClient<T> {
    transport: T,
    base_url: String,
    max_payload_bytes: u64,
}

impl<T: RelayTransport> RelayClient<T> {
    /// `base_url` is the public prefix share links are composed under;
    /// `max_payload_bytes` caps plaintext size before encryption begins.
    pub fn new(transport: T, base_url: impl Into<String>, max_payload_bytes: u64) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_payload_bytes,
        }
    }

    /// Encrypt `plaintext` under fresh key material, upload the ciphertext
    /// under a fresh random identifier, and compose the share link.
    pub async fn send(&self, plaintext: &[u8], content_type: &str) -> RelayResult<SealedUpload> {
        self.send_with_id(ObjectId::random(), plaintext, content_type)
            .await
    }

    /// [`Self::send`] with a caller-chosen identifier.
    ///
    /// The identifier must be globally unguessable; reusing one overwrites
    /// the previous object on the relay.
    pub async fn send_with_id(
        &self,
        id: ObjectId,
        plaintext: &[u8],
        content_type: &str,
    ) -> RelayResult<SealedUpload> {
        let size = plaintext.len() as u64;
        if size > self.max_payload_bytes {
            // Rejected before key generation, encryption, or any transport
            // call, so oversized payloads never cost a network round trip.
            return Err(RelayError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }

        let key = SecretKey::generate().map_err(crypto_to_relay)?;
        let nonce = Nonce::generate().map_err(crypto_to_relay)?;
        let ciphertext = vdrop_crypto::encrypt(plaintext, &key, &nonce).map_err(crypto_to_relay)?;
        debug!(id = %id, plaintext_bytes = size, "sealed");

        self.transport.put(&id, &ciphertext, content_type).await?;

        // The fragment exists only here and inside the returned link; it is
        // never part of a transport call.
        let link = compose_link(&self.base_url, id.as_str(), &key, &nonce);
        info!(id = %id, bytes = ciphertext.len(), "uploaded");

        Ok(SealedUpload { id, link })
    }

    /// Resolve a share link: download the ciphertext by identifier and
    /// decrypt it with the fragment-carried key material.
    ///
    /// A failed tag check surfaces as [`RelayError::Authentication`] with no
    /// partial data.
    pub async fn receive(&self, link: &str) -> RelayResult<ReceivedObject> {
        let (raw_id, fragment) = parse_link(link).map_err(crypto_to_relay)?;
        let (key, nonce) = decode_fragment(&fragment).map_err(crypto_to_relay)?;
        let id = ObjectId::parse(&raw_id)?;

        let (ciphertext, content_type) = self.transport.get(&id).await?;
        debug!(id = %id, bytes = ciphertext.len(), "downloaded");

        let bytes = vdrop_crypto::decrypt(&ciphertext, &key, &nonce).map_err(crypto_to_relay)?;
        info!(id = %id, bytes = bytes.len(), content_type = %content_type, "opened");

        Ok(ReceivedObject {
            bytes,
            content_type,
        })
    }
}

fn crypto_to_relay(err: CryptoError) -> RelayError {
    match err {
        CryptoError::Authentication | CryptoError::MalformedCiphertext(_) => {
            RelayError::Authentication
        }
        CryptoError::MalformedLink(msg) => RelayError::MalformedLink(msg),
        CryptoError::Encrypt => RelayError::Other(anyhow::anyhow!("encryption failed")),
        CryptoError::RandomSource(msg) => {
            RelayError::Other(anyhow::anyhow!("secure random source unavailable: {msg}"))
        }
    }
}
