//! The `LATEST.json` build pointer.

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Object key of the build pointer.
pub const POINTER_KEY: &str = "LATEST.json";

/// Object key of the serialized usearch index.
pub const INDEX_KEY: &str = "index.usearch";

/// Object key of the metadata side-table.
pub const METADATA_KEY: &str = "metadata.json";

const STATUS_READY: &str = "READY";
const STATUS_FAILED: &str = "FAILED";

/// Status and identity of the latest index build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPointer {
    /// `READY`, `FAILED`, or any in-progress marker
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub build_id: Option<String>,

    #[serde(default)]
    pub model_name: Option<String>,

    /// Set by the build job when `status` is `FAILED`
    #[serde(default)]
    pub error_message: Option<String>,
}

impl BuildPointer {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RagError> {
        serde_json::from_slice(bytes).map_err(|e| RagError::corrupt(POINTER_KEY, e))
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some(STATUS_READY)
    }

    /// Gate loading on the pointer status.
    ///
    /// `FAILED` yields [`RagError::BuildFailed`] with the build job's message;
    /// any status other than `READY`, including a missing one, yields
    /// [`RagError::NotReady`].
    pub fn ensure_ready(&self) -> Result<(), RagError> {
        match self.status.as_deref() {
            Some(STATUS_READY) => Ok(()),
            Some(STATUS_FAILED) => Err(RagError::BuildFailed {
                message: self
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
            Some(other) => Err(RagError::not_ready(format!("build status is {other}"))),
            None => Err(RagError::not_ready("build pointer has no status")),
        }
    }
}
