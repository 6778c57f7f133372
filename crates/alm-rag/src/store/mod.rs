//! Object storage capability.
//!
//! The loader only needs three operations: probe a bucket, read a small
//! object into memory, and stream a large one to a local file.

mod local;
mod s3;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use alm_types::{Settings, StorageBackend};

pub use local::LocalObjectStore;
pub use s3::{S3Config, S3ObjectStore};

/// Errors returned by an [`ObjectStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Bucket not found: {0}")]
    NoSuchBucket(String),

    #[error("Object not found: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// Network or protocol failure talking to the store
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store cannot be constructed from the given settings
    #[error("Store configuration error: {0}")]
    Config(String),
}

/// Read access to a bucketed object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    /// Read a whole object into memory.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Write an object to `dest`, returning the number of bytes written.
    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StoreError>;
}

/// Build the object store selected by `storage.backend`.
pub fn store_from_settings(settings: &Settings) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match settings.storage.backend {
        StorageBackend::Local => Ok(Arc::new(LocalObjectStore::new(
            settings.expanded_local_root(),
        ))),
        StorageBackend::S3 => {
            let config = S3Config::from_settings(&settings.storage)?;
            Ok(Arc::new(S3ObjectStore::new(config)?))
        }
    }
}
