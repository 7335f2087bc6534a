//! Transport between the relay client and the storage proxy.
//!
//! Implementations carry opaque ciphertext and the declared content type;
//! nothing else crosses this boundary. In particular the link fragment never
//! appears in any transport call.

use vdrop_core::{ObjectId, RelayError, RelayResult};
use vdrop_storage::BlindStore;

/// Upload/download surface the relay client orchestrates against.
#[allow(async_fn_in_trait)]
pub trait RelayTransport {
    /// Store `ciphertext` under `id` with its declared content type.
    async fn put(&self, id: &ObjectId, ciphertext: &[u8], content_type: &str) -> RelayResult<()>;

    /// Fetch the ciphertext and declared content type for `id`.
    async fn get(&self, id: &ObjectId) -> RelayResult<(Vec<u8>, String)>;
}

/// In-process transport wrapping a [`BlindStore`] directly.
///
/// Used by tests and by deployments that embed the proxy in the same
/// process as the client.
#[derive(Clone)]
pub struct StoreTransport {
    store: BlindStore,
}

impl StoreTransport {
    pub fn new(store: BlindStore) -> Self {
        Self { store }
    }
}

impl RelayTransport for StoreTransport {
    async fn put(&self, id: &ObjectId, ciphertext: &[u8], content_type: &str) -> RelayResult<()> {
        self.store.put(id, ciphertext, content_type).await
    }

    async fn get(&self, id: &ObjectId) -> RelayResult<(Vec<u8>, String)> {
        self.store.get(id).await
    }
}

/// HTTP transport speaking the vdropd daemon's surface:
/// multipart `POST /files/upload` and `GET /files/download/<id>`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RelayTransport for HttpTransport {
    async fn put(&self, id: &ObjectId, ciphertext: &[u8], content_type: &str) -> RelayResult<()> {
        // Field names match the daemon's multipart extractor
        let form = reqwest::multipart::Form::new()
            .text("fileKey", id.to_string())
            .text("contentType", content_type.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(ciphertext.to_vec())
                    .file_name(format!("{id}.encrypted")),
            );

        let response = self
            .client
            .post(format!("{}/files/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::Transport(format!("upload request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::PAYLOAD_TOO_LARGE {
            // The client-side pre-flight check should have caught this; the
            // relay's own cap is the backstop.
            return Err(RelayError::Validation(
                "relay rejected upload: payload exceeds the relay's size limit".into(),
            ));
        }
        if status.is_client_error() {
            return Err(RelayError::Validation(format!(
                "relay rejected upload: {status}"
            )));
        }
        if !status.is_success() {
            return Err(RelayError::Transport(format!("upload failed: {status}")));
        }
        Ok(())
    }

    async fn get(&self, id: &ObjectId) -> RelayResult<(Vec<u8>, String)> {
        let response = self
            .client
            .get(format!("{}/files/download/{id}", self.base_url))
            .send()
            .await
            .map_err(|e| RelayError::Transport(format!("download request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(RelayError::Transport(format!("download failed: {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(format!("download body failed: {e}")))?;

        Ok((bytes.to_vec(), content_type))
    }
}
