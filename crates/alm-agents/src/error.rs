//! Agent-layer error types.

use thiserror::Error;

use alm_rag::{RagError, StoreError};

/// Errors raised by capabilities and batch processing.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Embedding service request failed
    #[error("Embedding request failed: {0}")]
    Embedding(String),

    /// Embedding service answered with a non-success status
    #[error("Embedding service returned HTTP {status}: {body}")]
    EmbeddingStatus { status: u16, body: String },

    /// A capability returned something that could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("RAG error: {0}")]
    Rag(#[from] RagError),

    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Log source error: {0}")]
    LogSource(String),

    #[error("Failed to persist alerts: {0}")]
    Persist(String),

    /// One cluster's processing failed
    #[error("Processing cluster '{label}' failed: {message}")]
    Processing { label: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
