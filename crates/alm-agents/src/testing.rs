//! Test doubles for the capability traits.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use alm_rag::{
    BundleMetadata, ContextBuilder, IndexParams, LoaderConfig, LocalObjectStore, RagIndexLoader,
    UsearchIndex, INDEX_KEY, METADATA_KEY, POINTER_KEY,
};
use alm_types::{Alert, ErrorRecord, LogEntry};

use crate::capabilities::{
    AlertProcessor, AlertSink, ChatMessage, Embedder, LogSource, StructuredLlm, TimeRange,
};
use crate::error::AgentError;

pub(crate) const DIM: usize = 4;
const BUCKET: &str = "rag-index";

/// Returns the same vector for every input.
pub(crate) struct FixedEmbedder {
    vector: Option<Vec<f32>>,
}

impl FixedEmbedder {
    pub(crate) fn new(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { vector: None }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dimension(&self) -> usize {
        self.vector.as_ref().map_or(0, Vec::len)
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
        self.vector
            .clone()
            .ok_or_else(|| AgentError::Embedding("connection refused".to_string()))
    }
}

fn loader_for(root: &Path) -> Arc<RagIndexLoader> {
    let config = LoaderConfig {
        bucket: BUCKET.to_string(),
        embedding_dim: DIM,
        ..LoaderConfig::default()
    };
    Arc::new(RagIndexLoader::new(
        Arc::new(LocalObjectStore::new(root)),
        config,
    ))
}

pub(crate) fn unloaded_builder() -> (TempDir, ContextBuilder) {
    let temp = TempDir::new().unwrap();
    let builder = ContextBuilder::new(loader_for(temp.path()));
    (temp, builder)
}

/// Three records on the axes of a 4-dimensional space, loaded and served.
pub(crate) async fn loaded_builder() -> (TempDir, ContextBuilder) {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(BUCKET);
    std::fs::create_dir_all(&dir).unwrap();

    let vectors: Vec<Vec<f32>> = (0..3)
        .map(|i| (0..DIM).map(|d| if d == i { 1.0 } else { 0.0 }).collect())
        .collect();
    UsearchIndex::from_vectors(DIM, &vectors, &IndexParams::default())
        .unwrap()
        .save(&dir.join(INDEX_KEY))
        .unwrap();

    let metadata = BundleMetadata {
        error_store: (0..3)
            .map(|i| {
                let record = ErrorRecord::new(format!("known failure {i}"))
                    .with_title(format!("Failure {i}"))
                    .with_solution(format!("Run fix {i}"));
                (format!("e{i}"), record)
            })
            .collect::<HashMap<_, _>>(),
        index_to_error_id: (0..3).map(|i| (i as u64, format!("e{i}"))).collect(),
        model_name: Some(LoaderConfig::default().model_name),
    };
    std::fs::write(dir.join(METADATA_KEY), serde_json::to_vec(&metadata).unwrap()).unwrap();
    std::fs::write(
        dir.join(POINTER_KEY),
        br#"{"status": "READY", "build_id": "b1"}"#,
    )
    .unwrap();

    let loader = loader_for(temp.path());
    loader.load().await.unwrap();
    (temp, ContextBuilder::new(loader))
}

/// Summarizes an entry by echoing its message; fails for one label.
#[derive(Default)]
pub(crate) struct SummaryProcessor {
    fail_label: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl SummaryProcessor {
    pub(crate) fn failing_on(label: &str) -> Self {
        Self {
            fail_label: Some(label.to_string()),
            ..Default::default()
        }
    }

    /// `(label, representative message)` per call
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertProcessor for SummaryProcessor {
    async fn process(&self, label: &str, entry: &LogEntry) -> Result<Alert, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((label.to_string(), entry.message.clone()));
        if self.fail_label.as_deref() == Some(label) {
            return Err(AgentError::Processing {
                label: label.to_string(),
                message: "llm timeout".to_string(),
            });
        }
        let mut alert = Alert::new(entry.clone());
        alert.log_summary = Some(format!("summary of {}", entry.message));
        alert.expert_classification = Some("Infrastructure".to_string());
        Ok(alert)
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    fail: bool,
    batches: Mutex<Vec<Vec<Alert>>>,
}

impl RecordingSink {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn batches(&self) -> Vec<Vec<Alert>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn persist(&self, alerts: &[Alert]) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::Persist("database unavailable".to_string()));
        }
        self.batches.lock().unwrap().push(alerts.to_vec());
        Ok(())
    }
}

/// Serves a fixed set of lines, filtered by range, and records queries.
#[derive(Default)]
pub(crate) struct StaticLogSource {
    entries: Vec<LogEntry>,
    queries: Mutex<Vec<(String, TimeRange)>>,
}

impl StaticLogSource {
    pub(crate) fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub(crate) fn queries(&self) -> Vec<(String, TimeRange)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for StaticLogSource {
    async fn fetch_logs(&self, query: &str, range: TimeRange) -> Result<Vec<LogEntry>, AgentError> {
        self.queries.lock().unwrap().push((query.to_string(), range));
        Ok(self
            .entries
            .iter()
            .filter(|e| range.contains(e.timestamp))
            .cloned()
            .collect())
    }
}

/// Answers with queued responses in order; fails once they run out.
#[derive(Default)]
pub(crate) struct CannedLlm {
    responses: Mutex<VecDeque<serde_json::Value>>,
    requests: Mutex<Vec<(Vec<ChatMessage>, serde_json::Value)>>,
}

impl CannedLlm {
    pub(crate) fn new(responses: Vec<serde_json::Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    /// `(messages, schema)` per call
    pub(crate) fn requests(&self) -> Vec<(Vec<ChatMessage>, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredLlm for CannedLlm {
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AgentError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), schema.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Llm("rate limited".to_string()))
    }
}
