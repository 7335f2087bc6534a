use serde::{Deserialize, Serialize};

/// Top-level daemon configuration (loaded from vdrop.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address for the relay HTTP surface
    pub listen: String,
    /// Prometheus metrics endpoint (default: 127.0.0.1:9100)
    pub metrics_addr: Option<String>,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

/// Backing object store selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible endpoint (MinIO, SeaweedFS, AWS)
    S3,
    /// In-process memory store, for tests and local development
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// S3 endpoint URL
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket holding the ciphertext objects
    pub bucket: String,
    /// Enforce HTTPS for S3 connections (warn/error on HTTP endpoints)
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum accepted payload size in bytes.
    ///
    /// Uploads larger than this are rejected before buffering; the relay
    /// client refuses them before encryption even starts.
    pub max_payload_bytes: u64,
}

/// 1 GiB, matching the reference deployment's upload cap.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 1024 * 1024 * 1024;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".into(),
            metrics_addr: Some("127.0.0.1:9100".into()),
            log_level: "info".into(),
            log_format: "json".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "vdrop".into(),
            enforce_tls: false,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.limits.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
        assert_eq!(cfg.storage.backend, StorageBackend::S3);
        assert_eq!(cfg.storage.region, "us-east-1");
    }

    #[test]
    fn test_parse_partial_toml() {
        // Missing sections and fields fall back to defaults
        let cfg: RelayConfig = toml::from_str(
            r#"
            [storage]
            backend = "memory"
            bucket = "drops"

            [limits]
            max_payload_bytes = 1048576
            "#,
        )
        .unwrap();

        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.storage.bucket, "drops");
        assert_eq!(cfg.limits.max_payload_bytes, 1_048_576);
        assert_eq!(cfg.server.listen, "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_empty_toml() {
        let cfg: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.log_level, "info");
    }
}
