//! RAG error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the index loader and the context builder.
#[derive(Debug, Error)]
pub enum RagError {
    /// The bucket or its build pointer does not exist; the build job has never run
    #[error("RAG index not initialized: bucket '{bucket}' has no build. Run the index build job first")]
    NotInitialized { bucket: String },

    /// The last build failed; a rebuild is required
    #[error("RAG index build failed: {message}. Run the index build job again")]
    BuildFailed { message: String },

    /// A build is in progress or the pointer is unusable; retry later
    #[error("RAG index is not ready: {reason}")]
    NotReady { reason: String },

    /// An artifact was fetched but could not be materialized
    #[error("RAG artifact '{artifact}' is corrupt: {reason}")]
    ArtifactCorrupt { artifact: String, reason: String },

    /// Query vector dimension disagrees with the loaded index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Context requested before any bundle was loaded
    #[error("RAG index unavailable: no bundle has been loaded")]
    IndexUnavailable,
}

impl RagError {
    pub(crate) fn corrupt(artifact: impl Into<String>, reason: impl ToString) -> Self {
        RagError::ArtifactCorrupt {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_ready(reason: impl ToString) -> Self {
        RagError::NotReady {
            reason: reason.to_string(),
        }
    }

    /// Whether polling may eventually succeed without a rebuild.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RagError::NotReady { .. })
    }

    /// Whether context retrieval may fall back to an empty context.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RagError::IndexUnavailable | RagError::NotReady { .. })
    }

    /// Classify a failure to fetch an artifact once the pointer said READY.
    pub(crate) fn from_artifact_fetch(artifact: &str, err: StoreError) -> Self {
        match err {
            StoreError::Transport(reason) => RagError::not_ready(format!(
                "could not download {artifact}: {reason}"
            )),
            other => RagError::corrupt(artifact, other),
        }
    }
}
