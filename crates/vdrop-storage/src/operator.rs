//! OpenDAL Operator factory for the relay's backing object store.

use anyhow::{Context, Result};
use opendal::Operator;
use secrecy::{ExposeSecret, SecretString};
use vdrop_core::config::{StorageBackend, StorageConfig};

/// Environment variable holding the S3 access key id.
pub const ENV_ACCESS_KEY_ID: &str = "VDROP_S3_ACCESS_KEY_ID";
/// Environment variable holding the S3 secret access key.
pub const ENV_SECRET_ACCESS_KEY: &str = "VDROP_S3_SECRET_ACCESS_KEY";

/// S3 credentials, loaded from the environment at process start.
///
/// The secret key stays wrapped in [`SecretString`] until the operator is
/// built, so it never shows up in Debug output or logs.
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl S3Credentials {
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var(ENV_ACCESS_KEY_ID)
            .with_context(|| format!("{ENV_ACCESS_KEY_ID} is not set"))?;
        let secret_access_key = std::env::var(ENV_SECRET_ACCESS_KEY)
            .with_context(|| format!("{ENV_SECRET_ACCESS_KEY} is not set"))?;
        Ok(Self {
            access_key_id,
            secret_access_key: SecretString::from(secret_access_key),
        })
    }
}

/// Build an OpenDAL Operator for the configured backend.
///
/// S3 uses path-style addressing (the opendal default), which is what MinIO
/// and SeaweedFS require. The memory backend needs no credentials and is
/// meant for tests and local development.
///
/// If `enforce_tls` is set and the S3 endpoint uses HTTP, this returns an
/// error; otherwise a plaintext endpoint only logs a warning.
pub fn build_operator(cfg: &StorageConfig, creds: Option<&S3Credentials>) -> Result<Operator> {
    let op = match cfg.backend {
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .context("creating OpenDAL memory operator")?
            .finish(),
        StorageBackend::S3 => {
            if cfg.endpoint.starts_with("http://") {
                if cfg.enforce_tls {
                    anyhow::bail!(
                        "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                         Use an HTTPS endpoint or set storage.enforce_tls = false for local \
                         development.",
                        cfg.endpoint
                    );
                }
                tracing::warn!(
                    endpoint = %cfg.endpoint,
                    "S3 endpoint uses plaintext HTTP — credentials are transmitted unencrypted"
                );
            }

            let creds = creds.context("S3 backend requires credentials")?;
            let builder = opendal::services::S3::default()
                .endpoint(&cfg.endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket)
                .access_key_id(&creds.access_key_id)
                .secret_access_key(creds.secret_access_key.expose_secret());

            Operator::new(builder)
                .context("creating OpenDAL S3 operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .layer(
                    opendal::layers::RetryLayer::new()
                        .with_max_times(5)
                        .with_jitter(),
                )
                .finish()
        }
    };

    Ok(op)
}
