//! The relay's HTTP surface: blind upload/download pass-through.
//!
//! The daemon stores and returns ciphertext by identifier and never holds
//! key material; links are composed client-side and only their path portion
//! ever reaches these handlers. Payload bytes pass through untouched.
//!
//! Routes:
//!   POST /files/upload            — multipart (fileKey, contentType, file)
//!   GET  /files/download/{id}     — payload bytes + stored content type

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tracing::{error, info, warn};
use vdrop_core::config::RelayConfig;
use vdrop_core::{ObjectId, RelayError, RelayResult};
use vdrop_storage::{build_operator, BlindStore, S3Credentials};

use crate::metrics::{self, HealthState, Operation, Outcome, RelayMetrics};

/// Every failed download answers with this body. Not-found, storage trouble,
/// and malformed identifiers are indistinguishable from outside; the
/// concrete cause goes to the log.
const GENERIC_DOWNLOAD_ERROR: &str = "this link is invalid or the file could not be retrieved";

/// Slack on top of the payload cap for multipart framing overhead.
const BODY_LIMIT_SLACK: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: BlindStore,
    pub max_payload_bytes: u64,
    pub metrics: RelayMetrics,
}

/// Daemon entry point: storage bootstrap, metrics listener, HTTP serve.
pub async fn run(config: RelayConfig) -> Result<()> {
    let creds = match config.storage.backend {
        vdrop_core::config::StorageBackend::S3 => Some(S3Credentials::from_env()?),
        vdrop_core::config::StorageBackend::Memory => None,
    };
    let op = build_operator(&config.storage, creds.as_ref())?;
    let store = BlindStore::new(op);

    // One-time idempotent container bootstrap; racing instances are fine
    store.ensure_ready().await?;
    info!(bucket = %config.storage.bucket, "backing store ready");

    let mut registry = Registry::default();
    let relay_metrics = RelayMetrics::register(&mut registry);

    if let Some(addr) = config.server.metrics_addr.clone() {
        let health = HealthState {
            registry: Arc::new(registry),
            store: store.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(addr, health).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    let state = AppState {
        store,
        max_payload_bytes: config.limits.max_payload_bytes,
        metrics: relay_metrics,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .map_err(|e| anyhow::anyhow!("relay bind {}: {e}", config.server.listen))?;
    info!(addr = %config.server.listen, "relay: listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("relay server: {e}"))
}

pub fn router(state: AppState) -> Router {
    let body_limit = (state.max_payload_bytes + BODY_LIMIT_SLACK) as usize;
    Router::new()
        .route("/files/upload", post(upload_handler))
        .route("/files/download/{file_key}", get(download_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn upload_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    match handle_upload(&state, multipart).await {
        Ok(id) => {
            state.metrics.record(Operation::Upload, Outcome::Ok);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "fileKey": id.as_str() })),
            )
                .into_response()
        }
        Err(err) => {
            let (status, outcome, body) = match &err {
                RelayError::PayloadTooLarge { size, limit } => {
                    warn!(size, limit, "upload over the size limit");
                    (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        Outcome::ClientError,
                        "payload exceeds the size limit",
                    )
                }
                RelayError::Validation(cause) => {
                    warn!(%cause, "upload rejected");
                    (
                        StatusCode::BAD_REQUEST,
                        Outcome::ClientError,
                        "invalid upload request",
                    )
                }
                other => {
                    error!("upload failed: {other}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Outcome::Error,
                        "upload failed",
                    )
                }
            };
            state.metrics.record(Operation::Upload, outcome);
            (status, Json(serde_json::json!({ "error": body }))).into_response()
        }
    }
}

async fn handle_upload(state: &AppState, mut multipart: Multipart) -> RelayResult<ObjectId> {
    let mut file_key: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut payload: Option<axum::body::Bytes> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(RelayError::Validation(format!(
                    "malformed multipart body: {e}"
                )))
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fileKey" => {
                file_key = Some(field.text().await.map_err(|e| {
                    RelayError::Validation(format!("fileKey field unreadable: {e}"))
                })?);
            }
            "contentType" => {
                content_type = Some(field.text().await.map_err(|e| {
                    RelayError::Validation(format!("contentType field unreadable: {e}"))
                })?);
            }
            "file" => {
                payload = Some(field.bytes().await.map_err(|e| {
                    RelayError::Validation(format!("file field unreadable: {e}"))
                })?);
            }
            _ => {
                // Unknown field; drain and ignore
                let _ = field.bytes().await;
            }
        }
    }

    let raw_key =
        file_key.ok_or_else(|| RelayError::Validation("missing fileKey field".into()))?;
    let id = ObjectId::parse(&raw_key)?;
    let payload = payload.ok_or_else(|| RelayError::Validation("missing file field".into()))?;

    let size = payload.len() as u64;
    if size > state.max_payload_bytes {
        return Err(RelayError::PayloadTooLarge {
            size,
            limit: state.max_payload_bytes,
        });
    }

    state
        .store
        .put(&id, &payload, content_type.as_deref().unwrap_or(""))
        .await?;
    Ok(id)
}

async fn download_handler(
    State(state): State<AppState>,
    Path(file_key): Path<String>,
) -> Response {
    match handle_download(&state, &file_key).await {
        Ok((id, payload, content_type)) => {
            state.metrics.record(Operation::Download, Outcome::Ok);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{id}.encrypted\""),
                    ),
                ],
                payload,
            )
                .into_response()
        }
        Err(err) => {
            let outcome = match &err {
                RelayError::NotFound(id) => {
                    info!(id = %id, "download of unknown identifier");
                    Outcome::NotFound
                }
                RelayError::Validation(cause) => {
                    warn!(%cause, "download with malformed identifier");
                    Outcome::ClientError
                }
                other => {
                    error!("download failed: {other}");
                    Outcome::Error
                }
            };
            state.metrics.record(Operation::Download, outcome);
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": GENERIC_DOWNLOAD_ERROR })),
            )
                .into_response()
        }
    }
}

async fn handle_download(
    state: &AppState,
    file_key: &str,
) -> RelayResult<(ObjectId, Vec<u8>, String)> {
    let id = ObjectId::parse(file_key)?;
    let (payload, content_type) = state.store.get(&id).await?;
    Ok((id, payload, content_type))
}
