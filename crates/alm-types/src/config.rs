//! Configuration loading for the Ansible log monitor.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/alm/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::AlmError;

/// Where RAG index artifacts are read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// A local directory whose subdirectories act as buckets
    #[default]
    Local,
    /// An S3-compatible service (MinIO)
    S3,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the local backend
    #[serde(default = "default_local_root")]
    pub local_root: String,

    /// Endpoint URL for the s3 backend (scheme included)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Access key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub access_key: Option<String>,

    /// Secret key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Bucket holding LATEST.json and the index artifacts
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_local_root() -> String {
    ProjectDirs::from("", "", "alm")
        .map(|p| p.data_local_dir().join("object-store"))
        .unwrap_or_else(|| PathBuf::from("./object-store"))
        .to_string_lossy()
        .to_string()
}

fn default_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket() -> String {
    "rag-index".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            local_root: default_local_root(),
            endpoint: default_endpoint(),
            region: default_region(),
            access_key: None,
            secret_key: None,
            bucket: default_bucket(),
        }
    }
}

/// RAG index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Embedding model the index must have been built with
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Embedding dimension (nomic-embed-text-v1.5 = 768)
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Number of knowledge-base records retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Interval between readiness probes while waiting for a build
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up waiting for a READY build after this long
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
}

fn default_model_name() -> String {
    "nomic-ai/nomic-embed-text-v1.5".to_string()
}

fn default_embedding_dim() -> usize {
    768
}

fn default_top_k() -> usize {
    5
}

fn default_poll_interval() -> u64 {
    5
}

fn default_ready_timeout() -> u64 {
    600
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            embedding_dim: default_embedding_dim(),
            top_k: default_top_k(),
            poll_interval_secs: default_poll_interval(),
            ready_timeout_secs: default_ready_timeout(),
        }
    }
}

/// Embedding service (text-embeddings-inference) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embeddings_url")]
    pub api_url: String,

    #[serde(default = "default_embeddings_timeout")]
    pub timeout_secs: u64,
}

fn default_embeddings_url() -> String {
    "http://alm-embedding:8080".to_string()
}

fn default_embeddings_timeout() -> u64 {
    30
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_url: default_embeddings_url(),
            timeout_secs: default_embeddings_timeout(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub rag: RagSettings,

    #[serde(default)]
    pub embeddings: EmbeddingSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            rag: RagSettings::default(),
            embeddings: EmbeddingSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/alm/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (ALM_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, AlmError> {
        let config_dir = ProjectDirs::from("", "", "alm")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| AlmError::Config(e.to_string()))?
            .set_default("storage.bucket", default_bucket())
            .map_err(|e| AlmError::Config(e.to_string()))?
            .set_default("rag.model_name", default_model_name())
            .map_err(|e| AlmError::Config(e.to_string()))?
            .set_default("rag.embedding_dim", default_embedding_dim() as i64)
            .map_err(|e| AlmError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: ALM_LOG_LEVEL, ALM_STORAGE__BUCKET, ALM_RAG__TOP_K, etc.
        builder = builder.add_source(
            Environment::with_prefix("ALM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AlmError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| AlmError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), AlmError> {
        if self.rag.embedding_dim == 0 {
            return Err(AlmError::Config("rag.embedding_dim must be > 0".to_string()));
        }
        if self.rag.top_k == 0 {
            return Err(AlmError::Config("rag.top_k must be > 0".to_string()));
        }
        if self.rag.model_name.trim().is_empty() {
            return Err(AlmError::Config("rag.model_name must be set".to_string()));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(AlmError::Config("storage.bucket must be set".to_string()));
        }
        if self.storage.backend == StorageBackend::S3
            && (self.storage.access_key.is_none() || self.storage.secret_key.is_none())
        {
            return Err(AlmError::Config(
                "s3 backend requires storage.access_key and storage.secret_key".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in the local object store root.
    pub fn expanded_local_root(&self) -> PathBuf {
        if let Some(rest) = self.storage.local_root.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.storage.local_root)
    }
}
