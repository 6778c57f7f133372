//! RAG index lifecycle: pointer gating, download, validation and swap.
//!
//! The loader owns the served [`IndexBundle`]. Readers take an `Arc`
//! snapshot without blocking; a reload builds a complete new bundle off the
//! async runtime and replaces the old one with a single atomic store.
//!
//! States: `Unloaded -> Loading -> Loaded`, `Loading -> Failed(reason)`.
//! A failed reload leaves the previously loaded bundle servable.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use alm_types::Settings;

use crate::bundle::{BundleMetadata, IndexBundle};
use crate::error::RagError;
use crate::index::{NeighborIndex, UsearchIndex};
use crate::pointer::{BuildPointer, INDEX_KEY, METADATA_KEY, POINTER_KEY};
use crate::store::{ObjectStore, StoreError};

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Bucket holding the pointer and artifacts
    pub bucket: String,
    /// Embedding model the index is expected to be built with
    pub model_name: String,
    /// Required vector dimension
    pub embedding_dim: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bucket: "rag-index".to_string(),
            model_name: "nomic-ai/nomic-embed-text-v1.5".to_string(),
            embedding_dim: 768,
        }
    }
}

impl LoaderConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bucket: settings.storage.bucket.clone(),
            model_name: settings.rag.model_name.clone(),
            embedding_dim: settings.rag.embedding_dim,
        }
    }
}

/// Observable loader state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderState {
    Unloaded,
    Loading,
    Loaded { build_id: Option<String> },
    Failed { reason: String },
}

/// Loads the versioned RAG index from object storage.
pub struct RagIndexLoader {
    fetcher: Fetcher,
    shared: Arc<Shared>,
    /// Serializes load/reload so only one download runs at a time
    reload_lock: Arc<Mutex<()>>,
}

/// Served bundle and state, shared with the spawned load task.
struct Shared {
    current: ArcSwapOption<IndexBundle>,
    state: ArcSwap<LoaderState>,
    /// Bumped after every successful swap
    generation: AtomicU64,
}

impl Shared {
    fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    fn finish(&self, result: Result<IndexBundle, RagError>) -> Result<Arc<IndexBundle>, RagError> {
        match result {
            Ok(bundle) => {
                let bundle = Arc::new(bundle);
                self.current.store(Some(Arc::clone(&bundle)));
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.state.store(Arc::new(LoaderState::Loaded {
                    build_id: bundle.build_id().map(str::to_string),
                }));
                info!(
                    build_id = bundle.build_id().unwrap_or("unknown"),
                    vectors = bundle.vector_count(),
                    records = bundle.record_count(),
                    "RAG index loaded"
                );
                Ok(bundle)
            }
            Err(e) => {
                warn!(error = %e, serving_previous = self.is_loaded(), "RAG index load failed");
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&self, err: &RagError) {
        self.state.store(Arc::new(LoaderState::Failed {
            reason: err.to_string(),
        }));
    }
}

impl RagIndexLoader {
    pub fn new(store: Arc<dyn ObjectStore>, config: LoaderConfig) -> Self {
        Self {
            fetcher: Fetcher { store, config },
            shared: Arc::new(Shared {
                current: ArcSwapOption::empty(),
                state: ArcSwap::from_pointee(LoaderState::Unloaded),
                generation: AtomicU64::new(0),
            }),
            reload_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.fetcher.config
    }

    pub fn state(&self) -> LoaderState {
        LoaderState::clone(&self.shared.state.load_full())
    }

    /// The bundle currently served, if any.
    pub fn snapshot(&self) -> Option<Arc<IndexBundle>> {
        self.shared.current.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.is_loaded()
    }

    /// Build id of the bundle currently served.
    pub fn last_loaded_build_id(&self) -> Option<String> {
        self.snapshot()
            .and_then(|bundle| bundle.build_id().map(str::to_string))
    }

    /// Return the loaded bundle, loading it first if nothing is loaded yet.
    ///
    /// A loaded bundle is returned as-is without touching the store; use
    /// [`RagIndexLoader::reload`] to pick up a newer build.
    pub async fn load(&self) -> Result<Arc<IndexBundle>, RagError> {
        if let Some(bundle) = self.snapshot() {
            return Ok(bundle);
        }

        let guard = Arc::clone(&self.reload_lock).lock_owned().await;
        if let Some(bundle) = self.snapshot() {
            return Ok(bundle);
        }
        self.run_load(guard).await
    }

    /// Force a re-fetch of the latest build.
    ///
    /// A call that queued behind a reload which succeeded while it waited
    /// returns that reload's bundle instead of downloading again.
    pub async fn reload(&self) -> Result<Arc<IndexBundle>, RagError> {
        let seen = self.shared.generation.load(Ordering::SeqCst);
        let guard = Arc::clone(&self.reload_lock).lock_owned().await;

        if self.shared.generation.load(Ordering::SeqCst) != seen {
            if let Some(bundle) = self.snapshot() {
                debug!("Reload coalesced with the one that just finished");
                return Ok(bundle);
            }
        }
        self.run_load(guard).await
    }

    /// Cheap readiness probe: reads the pointer only, never downloads.
    ///
    /// Every failure reads as "not ready".
    pub async fn check_ready(&self) -> bool {
        match self.fetcher.read_pointer().await {
            Ok(pointer) => pointer.is_ready(),
            Err(e) => {
                debug!(error = %e, "Readiness probe failed");
                false
            }
        }
    }

    /// Poll [`RagIndexLoader::check_ready`] until it succeeds or `timeout`
    /// elapses. Giving up leaves the loader untouched.
    pub async fn wait_until_ready(&self, timeout: Duration, poll_interval: Duration) -> bool {
        let bucket = &self.fetcher.config.bucket;
        let poll = async {
            loop {
                if self.check_ready().await {
                    return;
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(()) => {
                info!(bucket = %bucket, "RAG index is ready");
                true
            }
            Err(_) => {
                warn!(bucket = %bucket, timeout = ?timeout, "Timed out waiting for RAG index");
                false
            }
        }
    }

    /// Fetch and swap on a spawned task that owns `guard`.
    ///
    /// Dropping the returned future does not abort the download: the task
    /// still finishes in `Loaded` or `Failed` and releases the lock after.
    async fn run_load(&self, guard: OwnedMutexGuard<()>) -> Result<Arc<IndexBundle>, RagError> {
        let fetcher = self.fetcher.clone();
        let shared = Arc::clone(&self.shared);

        let task = tokio::spawn(async move {
            let _guard = guard;
            shared.state.store(Arc::new(LoaderState::Loading));
            info!(bucket = %fetcher.config.bucket, "Loading RAG index");
            let result = fetcher.fetch_bundle().await;
            shared.finish(result)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let err = RagError::not_ready(format!("load task failed: {e}"));
                self.shared.fail(&err);
                Err(err)
            }
        }
    }
}

/// Store access for one loader; cloned into each load task.
#[derive(Clone)]
struct Fetcher {
    store: Arc<dyn ObjectStore>,
    config: LoaderConfig,
}

impl Fetcher {
    async fn read_pointer(&self) -> Result<BuildPointer, RagError> {
        let bucket = &self.config.bucket;
        let exists = self
            .store
            .bucket_exists(bucket)
            .await
            .map_err(|e| self.classify_pointer_error(e))?;
        if !exists {
            return Err(RagError::NotInitialized {
                bucket: bucket.clone(),
            });
        }

        let bytes = self
            .store
            .get_object(bucket, POINTER_KEY)
            .await
            .map_err(|e| self.classify_pointer_error(e))?;
        BuildPointer::from_slice(&bytes)
    }

    fn classify_pointer_error(&self, err: StoreError) -> RagError {
        match err {
            StoreError::NoSuchBucket(_) | StoreError::NoSuchKey { .. } => RagError::NotInitialized {
                bucket: self.config.bucket.clone(),
            },
            other => RagError::not_ready(format!("could not read {POINTER_KEY}: {other}")),
        }
    }

    async fn fetch_bundle(&self) -> Result<IndexBundle, RagError> {
        let pointer = self.read_pointer().await?;
        pointer.ensure_ready()?;

        if let Some(model) = pointer.model_name.as_deref() {
            if model != self.config.model_name {
                warn!(
                    index_model = model,
                    expected = %self.config.model_name,
                    "Model mismatch in build pointer"
                );
            }
        }

        // Removed on drop, on every path out of this function.
        let scratch = tempfile::Builder::new()
            .prefix("rag-index-")
            .tempdir()
            .map_err(|e| RagError::not_ready(format!("could not create scratch directory: {e}")))?;
        let index_path = scratch.path().join(INDEX_KEY);
        let metadata_path = scratch.path().join(METADATA_KEY);

        self.download(INDEX_KEY, &index_path).await?;
        self.download(METADATA_KEY, &metadata_path).await?;

        let expected_dim = self.config.embedding_dim;
        let model_name = self.config.model_name.clone();
        let build_id = pointer.build_id.clone();
        let bundle = tokio::task::spawn_blocking(move || {
            materialize(index_path, metadata_path, expected_dim, &model_name, build_id)
        })
        .await
        .map_err(|e| RagError::corrupt(INDEX_KEY, format!("materialization task failed: {e}")))??;

        if let Err(e) = scratch.close() {
            warn!(error = %e, "Failed to remove RAG scratch directory");
        }
        Ok(bundle)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), RagError> {
        let bytes = self
            .store
            .download_to(&self.config.bucket, key, dest)
            .await
            .map_err(|e| RagError::from_artifact_fetch(key, e))?;
        debug!(key, bytes, "Downloaded RAG artifact");
        Ok(())
    }
}

/// Deserialize and validate downloaded artifacts. Blocking.
fn materialize(
    index_path: PathBuf,
    metadata_path: PathBuf,
    expected_dim: usize,
    model_name: &str,
    build_id: Option<String>,
) -> Result<IndexBundle, RagError> {
    let raw = std::fs::read(&metadata_path).map_err(|e| RagError::corrupt(METADATA_KEY, e))?;
    let metadata = BundleMetadata::from_slice(&raw)?;

    if let Some(meta_model) = metadata.model_name.as_deref() {
        if meta_model != model_name {
            warn!(
                metadata_model = meta_model,
                expected = model_name,
                "Model mismatch in metadata"
            );
        }
    }

    let index = UsearchIndex::load(&index_path, expected_dim)?;
    if index.dimension() != expected_dim {
        return Err(RagError::corrupt(
            INDEX_KEY,
            format!(
                "index dimension {} does not match embedding dimension {expected_dim}",
                index.dimension()
            ),
        ));
    }

    IndexBundle::from_metadata(build_id, Box::new(index), metadata)
}
