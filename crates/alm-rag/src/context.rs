//! Retrieval context for prompts.
//!
//! Looks up the nearest knowledge-base records for a query embedding and
//! renders them as one text block. No I/O: a bundle must already be loaded.

use std::sync::Arc;

use tracing::debug;

use alm_types::ErrorRecord;

use crate::bundle::IndexBundle;
use crate::error::RagError;
use crate::loader::RagIndexLoader;

/// Longest record message rendered before truncation.
pub const MAX_RECORD_MESSAGE_CHARS: usize = 500;

/// Appended to a truncated record message.
pub const TRUNCATION_MARKER: &str = " [TRUNCATED - LOG MESSAGE CONTINUES]";

/// Line between rendered records.
pub const CONTEXT_DIVIDER: &str =
    "--------------------------------------------------------------------------------";

/// One record returned by a neighbor search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedRecord {
    pub id: String,
    pub distance: f32,
    pub record: ErrorRecord,
}

/// Builds retrieval context against the loader's current bundle.
#[derive(Clone)]
pub struct ContextBuilder {
    loader: Arc<RagIndexLoader>,
}

impl ContextBuilder {
    pub fn new(loader: Arc<RagIndexLoader>) -> Self {
        Self { loader }
    }

    /// Up to `k` records closest to `query`, closest first.
    ///
    /// Fails with [`RagError::IndexUnavailable`] when nothing is loaded; never
    /// loads implicitly.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedRecord>, RagError> {
        let bundle = self.loader.snapshot().ok_or(RagError::IndexUnavailable)?;
        retrieve_from_bundle(&bundle, query, k)
    }

    /// [`ContextBuilder::retrieve`] rendered with [`format_context`].
    pub fn build_context(&self, query: &[f32], k: usize) -> Result<String, RagError> {
        let records = self.retrieve(query, k)?;
        Ok(format_context(&records))
    }
}

/// Search one bundle, skipping ordinals with no id or no record.
pub fn retrieve_from_bundle(
    bundle: &IndexBundle,
    query: &[f32],
    k: usize,
) -> Result<Vec<RetrievedRecord>, RagError> {
    let expected = bundle.dimension();
    if query.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }

    let neighbors = bundle.index().search(query, k)?;
    let found = neighbors.len();
    let records: Vec<RetrievedRecord> = neighbors
        .into_iter()
        .filter_map(|neighbor| {
            let (id, record) = bundle.lookup(neighbor.ordinal)?;
            Some(RetrievedRecord {
                id: id.to_string(),
                distance: neighbor.distance,
                record: record.clone(),
            })
        })
        .collect();

    if records.len() < found {
        debug!(
            skipped = found - records.len(),
            "Skipped neighbors without metadata"
        );
    }
    Ok(records)
}

/// Cap a record message at [`MAX_RECORD_MESSAGE_CHARS`], marking the cut.
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_RECORD_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}{}", &message[..cut], TRUNCATION_MARKER),
        None => message.to_string(),
    }
}

/// Render records as numbered entries, each followed by [`CONTEXT_DIVIDER`].
///
/// ```text
/// [1] <title or id>
/// Category: <category>
/// Error: <message, truncated>
/// Solution: <solution>
/// ----...
/// ```
///
/// Records without a category or solution omit those lines. No records
/// render as an empty string.
pub fn format_context(records: &[RetrievedRecord]) -> String {
    let mut out = String::new();
    for (i, retrieved) in records.iter().enumerate() {
        let record = &retrieved.record;
        let title = record.error_title.as_deref().unwrap_or(&retrieved.id);

        out.push_str(&format!("[{}] {}\n", i + 1, title));
        if let Some(category) = record.category.as_deref() {
            out.push_str(&format!("Category: {category}\n"));
        }
        out.push_str(&format!("Error: {}\n", truncate_message(&record.error_message)));
        if let Some(solution) = record.solution.as_deref() {
            out.push_str(&format!("Solution: {solution}\n"));
        }
        out.push_str(CONTEXT_DIVIDER);
        out.push('\n');
    }
    out
}
