//! Fixtures shared by the unit tests of this crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use alm_types::ErrorRecord;

use crate::bundle::BundleMetadata;
use crate::error::RagError;
use crate::index::{IndexParams, Neighbor, NeighborIndex, UsearchIndex};
use crate::pointer::{INDEX_KEY, METADATA_KEY, POINTER_KEY};
use crate::store::{LocalObjectStore, ObjectStore, StoreError};

pub(crate) const DIM: usize = 8;

/// Brute-force L2 index; vector `i` has every component equal to `i`.
pub(crate) struct FixedIndex {
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl FixedIndex {
    pub(crate) fn new(n: usize, dimension: usize) -> Self {
        Self {
            vectors: (0..n).map(|i| vec![i as f32; dimension]).collect(),
            dimension,
        }
    }
}

impl NeighborIndex for FixedIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn contains(&self, ordinal: u64) -> bool {
        (ordinal as usize) < self.vectors.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        let mut hits: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| Neighbor {
                ordinal: i as u64,
                distance: v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum(),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Deterministic, pairwise-distinct unit-ish vectors.
pub(crate) fn basis_vector(i: usize, dimension: usize) -> Vec<f32> {
    (0..dimension)
        .map(|d| if d == i % dimension { 1.0 } else { 0.05 * (i / dimension + 1) as f32 })
        .collect()
}

/// Write a complete READY build with `n` records into `root/bucket`.
pub(crate) fn write_build(root: &Path, bucket: &str, build_id: &str, n: usize, dimension: usize) {
    let dir = root.join(bucket);
    std::fs::create_dir_all(&dir).unwrap();

    let vectors: Vec<Vec<f32>> = (0..n).map(|i| basis_vector(i, dimension)).collect();
    UsearchIndex::from_vectors(dimension, &vectors, &IndexParams::default())
        .unwrap()
        .save(&dir.join(INDEX_KEY))
        .unwrap();

    let metadata = BundleMetadata {
        error_store: (0..n)
            .map(|i| {
                let record = ErrorRecord::new(format!("error number {i}"))
                    .with_title(format!("Known error {i}"))
                    .with_solution(format!("Apply fix {i}"));
                (format!("{build_id}-e{i}"), record)
            })
            .collect::<HashMap<_, _>>(),
        index_to_error_id: (0..n).map(|i| (i as u64, format!("{build_id}-e{i}"))).collect(),
        model_name: Some("nomic-ai/nomic-embed-text-v1.5".to_string()),
    };
    std::fs::write(dir.join(METADATA_KEY), serde_json::to_vec(&metadata).unwrap()).unwrap();

    write_pointer(
        root,
        bucket,
        json!({"status": "READY", "build_id": build_id, "model_name": "nomic-ai/nomic-embed-text-v1.5"}),
    );
}

pub(crate) fn write_pointer(root: &Path, bucket: &str, pointer: serde_json::Value) {
    let dir = root.join(bucket);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(POINTER_KEY), serde_json::to_vec(&pointer).unwrap()).unwrap();
}

/// Local store that records every download.
pub(crate) struct CountingStore {
    inner: LocalObjectStore,
    downloads: AtomicUsize,
    destinations: Mutex<Vec<PathBuf>>,
}

impl CountingStore {
    pub(crate) fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalObjectStore::new(root),
            downloads: AtomicUsize::new(0),
            destinations: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn index_downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub(crate) fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        self.inner.bucket_exists(bucket).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.get_object(bucket, key).await
    }

    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StoreError> {
        if key == INDEX_KEY {
            self.downloads.fetch_add(1, Ordering::SeqCst);
        }
        self.destinations.lock().unwrap().push(dest.to_path_buf());
        self.inner.download_to(bucket, key, dest).await
    }
}

/// Local store whose artifact downloads take `delay` each.
pub(crate) struct SlowStore {
    inner: LocalObjectStore,
    delay: Duration,
}

impl SlowStore {
    pub(crate) fn new(root: &Path, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalObjectStore::new(root),
            delay,
        })
    }
}

#[async_trait]
impl ObjectStore for SlowStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        self.inner.bucket_exists(bucket).await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.get_object(bucket, key).await
    }

    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.download_to(bucket, key, dest).await
    }
}
