//! Nearest-neighbor index over knowledge-base embeddings.
//!
//! Vector keys are ordinals `0..N`; the metadata side-table maps each ordinal
//! to a stable record id.

use std::path::Path;

use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::RagError;
use crate::pointer::INDEX_KEY;

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the vector in the index
    pub ordinal: u64,
    /// Distance to the query (lower is closer)
    pub distance: f32,
}

/// Read-only nearest-neighbor lookup.
///
/// Implementations must be thread-safe for concurrent searches.
pub trait NeighborIndex: Send + Sync {
    fn dimension(&self) -> usize;

    /// Number of vectors in the index
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, ordinal: u64) -> bool;

    /// Up to `k` neighbors, closest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError>;
}

/// HNSW tuning used when building an index.
#[derive(Debug, Clone)]
pub struct IndexParams {
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
        }
    }
}

fn options(dimension: usize, params: &IndexParams) -> IndexOptions {
    IndexOptions {
        dimensions: dimension,
        metric: MetricKind::Cos,
        quantization: ScalarKind::F32,
        connectivity: params.connectivity,
        expansion_add: params.expansion_add,
        expansion_search: params.expansion_search,
        multi: false,
    }
}

/// usearch HNSW index loaded from a serialized artifact.
pub struct UsearchIndex {
    index: Index,
}

impl UsearchIndex {
    /// Load a serialized index from a local file.
    ///
    /// Blocking; callers on the async runtime should use `spawn_blocking`.
    pub fn load(path: &Path, dimension: usize) -> Result<Self, RagError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| RagError::corrupt(INDEX_KEY, "invalid path encoding"))?;

        let index = Index::new(&options(dimension, &IndexParams::default()))
            .map_err(|e| RagError::corrupt(INDEX_KEY, e))?;
        index
            .load(path_str)
            .map_err(|e| RagError::corrupt(INDEX_KEY, format!("failed to load: {e}")))?;

        info!(path = ?path, vectors = index.size(), dim = index.dimensions(), "Loaded vector index");
        Ok(Self { index })
    }

    /// Build an in-memory index keyed by vector position.
    pub fn from_vectors(
        dimension: usize,
        vectors: &[Vec<f32>],
        params: &IndexParams,
    ) -> Result<Self, RagError> {
        let index =
            Index::new(&options(dimension, params)).map_err(|e| RagError::corrupt(INDEX_KEY, e))?;
        index
            .reserve(vectors.len().max(1))
            .map_err(|e| RagError::corrupt(INDEX_KEY, e))?;

        for (ordinal, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            index
                .add(ordinal as u64, vector.as_slice())
                .map_err(|e| RagError::corrupt(INDEX_KEY, e))?;
        }

        debug!(vectors = vectors.len(), dim = dimension, "Built vector index");
        Ok(Self { index })
    }

    /// Serialize the index to a local file.
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| RagError::corrupt(INDEX_KEY, "invalid path encoding"))?;
        self.index
            .save(path_str)
            .map_err(|e| RagError::corrupt(INDEX_KEY, format!("failed to save: {e}")))
    }
}

impl NeighborIndex for UsearchIndex {
    fn dimension(&self) -> usize {
        self.index.dimensions()
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn contains(&self, ordinal: u64) -> bool {
        self.index.contains(ordinal)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, RagError> {
        let expected = self.dimension();
        if query.len() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(query, k)
            .map_err(|e| RagError::corrupt(INDEX_KEY, format!("search failed: {e}")))?;

        let mut neighbors: Vec<Neighbor> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&ordinal, &distance)| Neighbor { ordinal, distance })
            .collect();
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        debug!(k, found = neighbors.len(), "Search complete");
        Ok(neighbors)
    }
}
