//! # alm-types
//!
//! Shared domain types for the Ansible log monitor.
//!
//! - Log statements: raw blocks and extracted error statements
//! - Knowledge-base records served by the RAG index
//! - Alerts: log entries and the enriched records produced from them
//! - Settings: layered configuration

pub mod alert;
pub mod config;
pub mod error;
pub mod log;
pub mod record;

pub use alert::{Alert, LogEntry};
pub use config::{EmbeddingSettings, RagSettings, Settings, StorageBackend, StorageSettings};
pub use error::AlmError;
pub use log::{DetectedLevel, ErrorStatement, LogBlock, MAX_MESSAGE_CHARS};
pub use record::ErrorRecord;
