use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{ObjectStore, StoreError};

/// Object store backed by a local directory.
///
/// Each subdirectory of `root` is a bucket; object keys are relative paths
/// inside it.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(self.bucket_path(bucket).join(relative))
    }

    /// Map a missing file to the right not-found kind.
    async fn not_found(&self, bucket: &str, key: &str, err: std::io::Error) -> StoreError {
        if err.kind() != ErrorKind::NotFound {
            return StoreError::Io(err);
        }
        if self.bucket_exists(bucket).await.unwrap_or(false) {
            StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        } else {
            StoreError::NoSuchBucket(bucket.to_string())
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        match tokio::fs::metadata(self.bucket_path(bucket)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => Err(self.not_found(bucket, key, e).await),
        }
    }

    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::copy(&path, dest).await {
            Ok(bytes) => {
                debug!(bucket, key, bytes, "Copied object");
                Ok(bytes)
            }
            Err(e) => Err(self.not_found(bucket, key, e).await),
        }
    }
}
