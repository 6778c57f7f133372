//! Log entries and the alerts produced from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A log line pulled from the log store, with its stream labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Source timestamp of the line
    pub timestamp: DateTime<Utc>,

    /// Log message text
    pub message: String,

    /// Stream labels (`filename`, `job`, `detected_level`, ...)
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            labels: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// File the line was read from, if the log store labelled it.
    pub fn file_name(&self) -> Option<&str> {
        self.labels.get("filename").map(String::as_str)
    }
}

/// An enriched alert for one log entry.
///
/// Every field after `log_entry` is filled in by an orchestration step and
/// stays `None` until that step has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub log_entry: LogEntry,

    /// Cluster label shared by semantically similar entries
    #[serde(default)]
    pub log_cluster: Option<String>,

    #[serde(default)]
    pub log_summary: Option<String>,

    #[serde(default)]
    pub expert_classification: Option<String>,

    #[serde(default)]
    pub need_more_context: Option<bool>,

    #[serde(default)]
    pub step_by_step_solution: Option<String>,

    /// Retrieved knowledge-base context the solution was generated from
    #[serde(default)]
    pub context_for_solution: Option<String>,
}

impl Alert {
    pub fn new(log_entry: LogEntry) -> Self {
        Self {
            log_entry,
            log_cluster: None,
            log_summary: None,
            expert_classification: None,
            need_more_context: None,
            step_by_step_solution: None,
            context_for_solution: None,
        }
    }

    pub fn with_cluster(mut self, label: impl Into<String>) -> Self {
        self.log_cluster = Some(label.into());
        self
    }

    /// Copy the enrichment of a cluster representative onto another entry
    /// of the same cluster.
    pub fn for_entry(&self, log_entry: LogEntry) -> Self {
        Self {
            log_entry,
            ..self.clone()
        }
    }
}
