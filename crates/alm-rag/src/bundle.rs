//! The servable index bundle and its metadata side-table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use alm_types::ErrorRecord;

use crate::error::RagError;
use crate::index::NeighborIndex;
use crate::pointer::METADATA_KEY;

/// Deserialized `metadata.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Stable record id to knowledge-base record
    pub error_store: HashMap<String, ErrorRecord>,

    /// Vector ordinal to record id; JSON keys are decimal strings
    pub index_to_error_id: BTreeMap<u64, String>,

    #[serde(default)]
    pub model_name: Option<String>,
}

impl BundleMetadata {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RagError> {
        serde_json::from_slice(bytes).map_err(|e| RagError::corrupt(METADATA_KEY, e))
    }
}

/// A loaded vector index together with its record maps.
///
/// Never mutated after construction; readers share it through an `Arc`.
pub struct IndexBundle {
    build_id: Option<String>,
    model_name: Option<String>,
    index: Box<dyn NeighborIndex>,
    error_store: HashMap<String, ErrorRecord>,
    index_to_id: Vec<String>,
}

impl IndexBundle {
    /// Assemble a bundle without checking consistency; see [`IndexBundle::validate`].
    pub fn new(
        build_id: Option<String>,
        model_name: Option<String>,
        index: Box<dyn NeighborIndex>,
        error_store: HashMap<String, ErrorRecord>,
        index_to_id: Vec<String>,
    ) -> Self {
        Self {
            build_id,
            model_name,
            index,
            error_store,
            index_to_id,
        }
    }

    /// Build and validate a bundle from a loaded index and its metadata.
    ///
    /// `index_to_error_id` must cover exactly the ordinals `0..N` of the
    /// index.
    pub fn from_metadata(
        build_id: Option<String>,
        index: Box<dyn NeighborIndex>,
        metadata: BundleMetadata,
    ) -> Result<Self, RagError> {
        let total = index.len() as u64;
        if let Some((&ordinal, _)) = metadata.index_to_error_id.range(total..).next() {
            return Err(RagError::corrupt(
                METADATA_KEY,
                format!("ordinal {ordinal} is outside the index (N = {total})"),
            ));
        }

        let mut by_ordinal = metadata.index_to_error_id;
        let mut index_to_id = Vec::with_capacity(total as usize);
        for ordinal in 0..total {
            let id = by_ordinal.remove(&ordinal).ok_or_else(|| {
                RagError::corrupt(METADATA_KEY, format!("ordinal {ordinal} has no record id"))
            })?;
            index_to_id.push(id);
        }

        let bundle = Self::new(
            build_id,
            metadata.model_name,
            index,
            metadata.error_store,
            index_to_id,
        );
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check that every ordinal in `0..N` is in the index, has an id, and that
    /// the id has a record.
    pub fn validate(&self) -> Result<(), RagError> {
        let total = self.index.len();
        if self.index_to_id.len() != total {
            return Err(RagError::corrupt(
                METADATA_KEY,
                format!(
                    "index has {total} vectors but {} ordinal mappings",
                    self.index_to_id.len()
                ),
            ));
        }

        for (ordinal, id) in self.index_to_id.iter().enumerate() {
            if !self.index.contains(ordinal as u64) {
                return Err(RagError::corrupt(
                    METADATA_KEY,
                    format!("ordinal {ordinal} is not a key of the vector index"),
                ));
            }
            if !self.error_store.contains_key(id) {
                return Err(RagError::corrupt(
                    METADATA_KEY,
                    format!("record id '{id}' (ordinal {ordinal}) is missing from error_store"),
                ));
            }
        }
        Ok(())
    }

    pub fn build_id(&self) -> Option<&str> {
        self.build_id.as_deref()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn index(&self) -> &dyn NeighborIndex {
        self.index.as_ref()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn vector_count(&self) -> usize {
        self.index.len()
    }

    pub fn record_count(&self) -> usize {
        self.error_store.len()
    }

    pub fn error_store(&self) -> &HashMap<String, ErrorRecord> {
        &self.error_store
    }

    pub fn index_to_id(&self) -> &[String] {
        &self.index_to_id
    }

    /// Map an ordinal to its id and record, if both exist.
    pub fn lookup(&self, ordinal: u64) -> Option<(&str, &ErrorRecord)> {
        let id = self.index_to_id.get(usize::try_from(ordinal).ok()?)?;
        let record = self.error_store.get(id)?;
        Some((id.as_str(), record))
    }
}

impl fmt::Debug for IndexBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBundle")
            .field("build_id", &self.build_id)
            .field("model_name", &self.model_name)
            .field("dimension", &self.index.dimension())
            .field("vectors", &self.index.len())
            .field("records", &self.error_store.len())
            .finish()
    }
}
