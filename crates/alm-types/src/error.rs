//! Error types for the Ansible log monitor.

use thiserror::Error;

/// Unified error type for configuration and shared-type operations.
#[derive(Debug, Error)]
pub enum AlmError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
