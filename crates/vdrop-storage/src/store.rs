//! Opaque blob storage with sidecar content-type metadata.
//!
//! Layout inside the bucket:
//! ```text
//! objects/<id>   ciphertext payload, byte-for-byte as received
//! meta/<id>      JSON sidecar: declared content type + size
//! ```
//!
//! The sidecar is written only after the payload write succeeds, and a
//! failed sidecar write deletes the payload again, so an identifier is
//! retrievable only when its payload is complete. Content type is stored
//! exactly as declared and never verified against the bytes.

use opendal::{ErrorKind, Operator};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use vdrop_core::{ObjectId, RelayError, RelayResult};

const OBJECT_PREFIX: &str = "objects/";
const META_PREFIX: &str = "meta/";

/// Longest accepted declared content type.
const MAX_CONTENT_TYPE_LEN: usize = 255;

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    size: u64,
}

/// Blind storage for encrypted objects.
///
/// Holds only ciphertext and unverified metadata; the key material needed to
/// decrypt anything in here never exists on this side of the wire.
#[derive(Clone)]
pub struct BlindStore {
    op: Operator,
}

impl BlindStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Idempotently make sure the backing container exists.
    ///
    /// Called once at startup. Probes the container and attempts creation if
    /// it is absent; a concurrent instance winning the creation race is
    /// treated as success. Safe to call from any number of starting
    /// processes.
    pub async fn ensure_ready(&self) -> RelayResult<()> {
        match self.op.list("/").await {
            Ok(_) => {
                debug!("backing container present");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("backing container not found, creating");
                match self.op.create_dir("/").await {
                    Ok(()) => {
                        info!("backing container created");
                        Ok(())
                    }
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        // Lost a benign race against a concurrent instance
                        info!("backing container created concurrently");
                        Ok(())
                    }
                    Err(e) => {
                        error!("backing container creation failed: {e}");
                        Err(RelayError::BackingStore(format!(
                            "container creation failed: {e}"
                        )))
                    }
                }
            }
            Err(e) => Err(RelayError::BackingStore(format!(
                "container probe failed: {e}"
            ))),
        }
    }

    /// Store an opaque payload under `id` with its declared content type.
    ///
    /// Storing to an identifier that already exists overwrites the previous
    /// object. Payload bytes are persisted untouched.
    pub async fn put(&self, id: &ObjectId, payload: &[u8], content_type: &str) -> RelayResult<()> {
        let content_type = validate_content_type(content_type)?;

        let object_path = format!("{OBJECT_PREFIX}{id}");
        self.op
            .write_with(&object_path, payload.to_vec())
            .content_type(&content_type)
            .await
            .map_err(|e| RelayError::BackingStore(format!("payload write failed: {e}")))?;

        let meta = ObjectMeta {
            content_type: content_type.clone(),
            size: payload.len() as u64,
        };
        let meta_bytes = serde_json::to_vec(&meta)
            .map_err(|e| RelayError::BackingStore(format!("metadata encode failed: {e}")))?;

        if let Err(e) = self.op.write(&format!("{META_PREFIX}{id}"), meta_bytes).await {
            // Without the sidecar the payload would be a half-written orphan;
            // remove it so the identifier stays unretrievable.
            if let Err(cleanup) = self.op.delete(&object_path).await {
                error!(id = %id, "orphan payload cleanup failed: {cleanup}");
            }
            return Err(RelayError::BackingStore(format!(
                "metadata write failed: {e}"
            )));
        }

        debug!(id = %id, bytes = payload.len(), content_type = %meta.content_type, "stored");
        Ok(())
    }

    /// Fetch the payload and declared content type for `id`.
    pub async fn get(&self, id: &ObjectId) -> RelayResult<(Vec<u8>, String)> {
        let meta_bytes = self
            .op
            .read(&format!("{META_PREFIX}{id}"))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RelayError::NotFound(id.to_string()),
                _ => RelayError::BackingStore(format!("metadata read failed: {e}")),
            })?;
        let meta: ObjectMeta = serde_json::from_slice(&meta_bytes.to_vec())
            .map_err(|e| RelayError::BackingStore(format!("metadata decode failed: {e}")))?;

        let payload = self
            .op
            .read(&format!("{OBJECT_PREFIX}{id}"))
            .await
            .map_err(|e| match e.kind() {
                // Sidecar exists but payload is gone: inconsistent store, not
                // a normal miss.
                ErrorKind::NotFound => {
                    error!(id = %id, "metadata present but payload missing");
                    RelayError::BackingStore("object payload missing".into())
                }
                _ => RelayError::BackingStore(format!("payload read failed: {e}")),
            })?;

        Ok((payload.to_vec(), meta.content_type))
    }

    /// Health probe used by the readiness endpoint. A root listing is the
    /// lightest request every backend supports.
    pub async fn check_health(&self) -> RelayResult<()> {
        self.op
            .list("/")
            .await
            .map(|_| ())
            .map_err(|e| RelayError::BackingStore(format!("health check failed: {e}")))
    }

    /// Non-panicking readiness flavor of [`Self::check_health`].
    pub async fn is_healthy(&self) -> bool {
        self.check_health().await.is_ok()
    }
}

fn validate_content_type(raw: &str) -> RelayResult<String> {
    if raw.is_empty() {
        // The reference relay stores whatever the uploader declared; an
        // absent declaration falls back to the generic octet-stream type.
        return Ok("application/octet-stream".to_string());
    }
    if raw.len() > MAX_CONTENT_TYPE_LEN {
        return Err(RelayError::Validation(format!(
            "content type too long: {} chars (limit {MAX_CONTENT_TYPE_LEN})",
            raw.len()
        )));
    }
    if raw.bytes().any(|b| b.is_ascii_control() || b >= 0x80) {
        return Err(RelayError::Validation(
            "content type contains non-printable characters".into(),
        ));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> BlindStore {
        let op = Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish();
        BlindStore::new(op)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = memory_store();
        let id = ObjectId::parse("abc-123").unwrap();
        let payload = b"opaque ciphertext bytes".to_vec();

        store.put(&id, &payload, "image/png").await.unwrap();
        let (got, content_type) = store.get(&id).await.unwrap();

        assert_eq!(got, payload);
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_payload_stored_byte_for_byte() {
        let store = memory_store();
        let id = ObjectId::parse("opaque").unwrap();
        // Arbitrary high-entropy bytes; the store must not transform them
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        store.put(&id, &payload, "application/octet-stream").await.unwrap();

        let raw = store
            .operator()
            .read(&format!("{OBJECT_PREFIX}{id}"))
            .await
            .unwrap();
        assert_eq!(raw.to_vec(), payload);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let store = memory_store();
        let id = ObjectId::parse("never-uploaded-id").unwrap();

        let result = store.get(&id).await;
        assert!(matches!(result, Err(RelayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_same_id_overwrites() {
        let store = memory_store();
        let id = ObjectId::parse("reused").unwrap();

        store.put(&id, b"first", "text/plain").await.unwrap();
        store.put(&id, b"second", "application/json").await.unwrap();

        let (payload, content_type) = store.get(&id).await.unwrap();
        assert_eq!(payload, b"second");
        assert_eq!(content_type, "application/json");
    }

    #[tokio::test]
    async fn test_empty_content_type_defaults_to_octet_stream() {
        let store = memory_store();
        let id = ObjectId::parse("untyped").unwrap();

        store.put(&id, b"bytes", "").await.unwrap();
        let (_, content_type) = store.get(&id).await.unwrap();
        assert_eq!(content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_content_type_with_control_chars_rejected() {
        let store = memory_store();
        let id = ObjectId::parse("bad-ct").unwrap();

        let result = store.put(&id, b"bytes", "text/plain\r\nX-Evil: 1").await;
        assert!(matches!(result, Err(RelayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let store = memory_store();
        store.ensure_ready().await.unwrap();
        store.ensure_ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = memory_store();
        store.check_health().await.unwrap();
        assert!(store.is_healthy().await);
    }

    #[tokio::test]
    async fn test_empty_payload_roundtrip() {
        let store = memory_store();
        let id = ObjectId::parse("empty").unwrap();

        store.put(&id, b"", "text/plain").await.unwrap();
        let (payload, _) = store.get(&id).await.unwrap();
        assert!(payload.is_empty());
    }
}
