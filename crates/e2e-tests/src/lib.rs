//! End-to-end test infrastructure for the Ansible log monitor.
//!
//! Provides a shared TestHarness backed by a local object store and helpers
//! for publishing index builds the way the build job does.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use alm_agents::{AgentError, AlertProcessor, AlertSink, Embedder};
use alm_rag::{
    BundleMetadata, ContextBuilder, IndexParams, LoaderConfig, LocalObjectStore, RagIndexLoader,
    UsearchIndex, INDEX_KEY, METADATA_KEY, POINTER_KEY,
};
use alm_types::{Alert, ErrorRecord, LogEntry};

pub const BUCKET: &str = "rag-index";
pub const MODEL: &str = "nomic-ai/nomic-embed-text-v1.5";

/// Vocabulary of [`KeywordEmbedder`]; one dimension per keyword.
pub const KEYWORDS: [&str; 6] = ["dnf", "ssh", "permission", "timeout", "disk", "template"];

/// A knowledge-base entry to publish: record id, record and its vector.
pub type Entry = (String, ErrorRecord, Vec<f32>);

/// Shared test harness for E2E tests.
///
/// The temp dir is the object store root; `root/BUCKET` is the bucket.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub root: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(BUCKET)
    }

    /// Loader over this harness's store.
    pub fn loader(&self, embedding_dim: usize) -> Arc<RagIndexLoader> {
        let config = LoaderConfig {
            bucket: BUCKET.to_string(),
            model_name: MODEL.to_string(),
            embedding_dim,
        };
        Arc::new(RagIndexLoader::new(
            Arc::new(LocalObjectStore::new(&self.root)),
            config,
        ))
    }

    pub fn context_builder(&self, loader: &Arc<RagIndexLoader>) -> ContextBuilder {
        ContextBuilder::new(Arc::clone(loader))
    }

    /// Write index and metadata artifacts, then flip the pointer to READY.
    pub fn publish_build(&self, build_id: &str, entries: &[Entry]) {
        let dir = self.bucket_dir();
        std::fs::create_dir_all(&dir).expect("Failed to create bucket dir");

        let dimension = entries.first().map(|(_, _, v)| v.len()).expect("empty build");
        let vectors: Vec<Vec<f32>> = entries.iter().map(|(_, _, v)| v.clone()).collect();
        UsearchIndex::from_vectors(dimension, &vectors, &IndexParams::default())
            .expect("Failed to build index")
            .save(&dir.join(INDEX_KEY))
            .expect("Failed to save index");

        let metadata = BundleMetadata {
            error_store: entries
                .iter()
                .map(|(id, record, _)| (id.clone(), record.clone()))
                .collect::<HashMap<_, _>>(),
            index_to_error_id: entries
                .iter()
                .enumerate()
                .map(|(i, (id, _, _))| (i as u64, id.clone()))
                .collect::<BTreeMap<_, _>>(),
            model_name: Some(MODEL.to_string()),
        };
        std::fs::write(
            dir.join(METADATA_KEY),
            serde_json::to_vec(&metadata).expect("Failed to serialize metadata"),
        )
        .expect("Failed to write metadata");

        self.write_pointer(serde_json::json!({
            "status": "READY",
            "build_id": build_id,
            "model_name": MODEL,
        }));
    }

    pub fn write_pointer(&self, pointer: serde_json::Value) {
        let dir = self.bucket_dir();
        std::fs::create_dir_all(&dir).expect("Failed to create bucket dir");
        std::fs::write(
            dir.join(POINTER_KEY),
            serde_json::to_vec(&pointer).expect("Failed to serialize pointer"),
        )
        .expect("Failed to write pointer");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Count of each [`KEYWORDS`] entry in `text`, L2-normalized.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut vector: Vec<f32> = KEYWORDS
        .iter()
        .map(|k| lower.matches(k).count() as f32)
        .collect();
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    } else {
        vector.iter_mut().for_each(|v| *v = 1.0 / (KEYWORDS.len() as f32).sqrt());
    }
    vector
}

/// Knowledge base with one record per keyword.
pub fn keyword_knowledge_base(build_id: &str) -> Vec<Entry> {
    KEYWORDS
        .iter()
        .map(|keyword| {
            let record = ErrorRecord::new(format!("{keyword} failure during task"))
                .with_title(format!("{keyword} problem"))
                .with_solution(format!("Fix the {keyword} configuration"))
                .with_category("Infrastructure");
            (format!("{build_id}-{keyword}"), record, keyword_vector(keyword))
        })
        .collect()
}

/// `n` random unit vectors, reproducible from `seed`.
pub fn random_entries(build_id: &str, n: usize, dimension: usize, seed: u64) -> Vec<Entry> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let mut v: Vec<f32> = (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect();
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(f32::EPSILON);
            v.iter_mut().for_each(|x| *x /= norm);
            let record = ErrorRecord::new(format!("synthetic error {i}"));
            (format!("{build_id}-r{i}"), record, v)
        })
        .collect()
}

/// Embeds by keyword counts; see [`keyword_vector`].
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn dimension(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        Ok(keyword_vector(text))
    }
}

/// Processor that retrieves context for the entry message.
pub struct RetrievingProcessor {
    pub builder: ContextBuilder,
}

#[async_trait]
impl AlertProcessor for RetrievingProcessor {
    async fn process(&self, label: &str, entry: &LogEntry) -> Result<Alert, AgentError> {
        let context =
            alm_agents::retrieve_cheat_sheet_context(&KeywordEmbedder, &self.builder, &entry.message, 1)
                .await?;
        let mut alert = Alert::new(entry.clone()).with_cluster(label);
        alert.log_summary = Some(entry.message.clone());
        alert.context_for_solution = Some(context);
        Ok(alert)
    }
}

/// Sink keeping every persisted batch in memory.
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<Alert>>>,
}

impl MemorySink {
    pub fn batches(&self) -> Vec<Vec<Alert>> {
        self.batches.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl AlertSink for MemorySink {
    async fn persist(&self, alerts: &[Alert]) -> Result<(), AgentError> {
        self.batches.lock().expect("sink lock").push(alerts.to_vec());
        Ok(())
    }
}

/// Ansible run log with two failing tasks and one ignored failure.
pub const SAMPLE_LOG: &str = r#"PLAY [webservers] **************************************************************

TASK [Gathering Facts] *********************************************************
ok: [web1]
ok: [web2]

TASK [Install packages] ********************************************************
Tuesday 14 October 2025  10:00:00 +0000 (0:00:01.234)       0:00:05.678 *******
fatal: [web1]: FAILED! => {"changed": false, "msg": "Failed to download metadata for repo: dnf cache is locked"}
ok: [web2]

TASK [Clean disk cache] ********************************************************
fatal: [web2]: FAILED! => {"changed": false, "msg": "disk quota exceeded"}
...ignoring

TASK [Copy keys] ***************************************************************
fatal: [web2]: UNREACHABLE! => {"changed": false, "msg": "Failed to connect to the host via ssh: Connection refused", "unreachable": true}

PLAY RECAP *********************************************************************
web1                       : ok=1    changed=0    unreachable=0    failed=1
web2                       : ok=2    changed=0    unreachable=1    failed=0    ignored=1
"#;
