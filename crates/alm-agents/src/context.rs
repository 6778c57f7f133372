use tracing::warn;

use alm_rag::ContextBuilder;

use crate::capabilities::Embedder;
use crate::error::AgentError;

/// Retrieve knowledge-base context for a log summary.
///
/// An index that is unavailable or not ready yet degrades to an empty
/// context so the alert can still be produced. Every other failure,
/// embedding errors and dimension mismatches included, is returned.
pub async fn retrieve_cheat_sheet_context(
    embedder: &dyn Embedder,
    builder: &ContextBuilder,
    summary: &str,
    k: usize,
) -> Result<String, AgentError> {
    let query = embedder.embed(summary).await?;
    match builder.build_context(&query, k) {
        Ok(context) => Ok(context),
        Err(e) if e.is_unavailable() => {
            warn!(error = %e, "RAG index unavailable, continuing without context");
            Ok(String::new())
        }
        Err(e) => Err(e.into()),
    }
}
