//! Capabilities consumed from external collaborators.
//!
//! Each collaborator is reached only through one of these traits, so the
//! orchestration layer can be wired against real services or test doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alm_types::{Alert, LogEntry};

use crate::error::AgentError;

/// Text embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimension of every vector returned by [`Embedder::embed`]
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError>;
}

/// Chat message sent to a structured-output LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM completion constrained to a JSON schema.
#[async_trait]
pub trait StructuredLlm: Send + Sync {
    /// Returns an instance of `schema`.
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AgentError>;
}

/// Inclusive time window for a log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// External log store (Loki).
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Lines matching a LogQL `query` within `range`.
    async fn fetch_logs(&self, query: &str, range: TimeRange) -> Result<Vec<LogEntry>, AgentError>;
}

/// Alert persistence.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Store a whole batch in one call.
    async fn persist(&self, alerts: &[Alert]) -> Result<(), AgentError>;
}

/// Per-cluster enrichment (summarize, classify, retrieve, solve).
#[async_trait]
pub trait AlertProcessor: Send + Sync {
    async fn process(&self, label: &str, entry: &LogEntry) -> Result<Alert, AgentError>;
}
