//! # alm-agents
//!
//! Seams between the Ansible log monitor and its external collaborators.
//!
//! Orchestration (summarize, classify, solve) is wired elsewhere through the
//! capability traits in [`capabilities`]. This crate provides the pieces
//! that carry failure semantics of their own: context retrieval that
//! degrades only when the index is unavailable, batch fan-out with
//! per-cluster isolation, stateless log tools and the service container.

pub mod batch;
pub mod capabilities;
pub mod context;
pub mod embedder;
pub mod error;
pub mod services;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{process_batch, BatchReport, ClusteredEntry};
pub use capabilities::{
    AlertProcessor, AlertSink, ChatMessage, Embedder, LogSource, StructuredLlm, TimeRange,
};
pub use context::retrieve_cheat_sheet_context;
pub use embedder::{TeiEmbedder, TeiEmbedderConfig};
pub use error::AgentError;
pub use services::Services;
pub use tools::{
    file_name_query, log_lines_above, LogLinesAbove, LogToolContext, CONTEXT_WINDOW_DAYS_BEFORE,
    CONTEXT_WINDOW_MINUTES_AFTER, DEFAULT_LINES_ABOVE,
};
