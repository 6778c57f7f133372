//! Batch alert processing with per-cluster failure isolation.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{info, warn};

use alm_types::{Alert, LogEntry};

use crate::capabilities::{AlertProcessor, AlertSink};
use crate::error::AgentError;

/// A log entry with its cluster label.
#[derive(Debug, Clone)]
pub struct ClusteredEntry {
    pub label: String,
    pub entry: LogEntry,
}

impl ClusteredEntry {
    pub fn new(label: impl Into<String>, entry: LogEntry) -> Self {
        Self {
            label: label.into(),
            entry,
        }
    }
}

/// Outcome of [`process_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Distinct cluster labels in the batch
    pub clusters: usize,
    /// Labels whose processing failed, with the error message
    pub failed_clusters: Vec<(String, String)>,
    pub alerts_persisted: usize,
    /// Entries dropped because their cluster failed
    pub entries_skipped: usize,
}

/// Enrich one representative per cluster concurrently, then persist one
/// alert per entry in a single call.
///
/// The last entry of each cluster is its representative. Every entry of a
/// successful cluster receives a copy of the representative's enrichment.
/// A failing cluster is logged and skipped without affecting the others.
pub async fn process_batch(
    items: &[ClusteredEntry],
    processor: &dyn AlertProcessor,
    sink: &dyn AlertSink,
) -> Result<BatchReport, AgentError> {
    let mut representatives: HashMap<&str, &LogEntry> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for item in items {
        if representatives.insert(&item.label, &item.entry).is_none() {
            order.push(&item.label);
        }
    }

    let outcomes = join_all(order.iter().map(|label| {
        let entry = representatives[label];
        async move { (*label, processor.process(label, entry).await) }
    }))
    .await;

    let mut report = BatchReport {
        clusters: order.len(),
        ..Default::default()
    };
    let mut enriched: HashMap<&str, Alert> = HashMap::new();
    for (label, outcome) in outcomes {
        match outcome {
            Ok(alert) => {
                enriched.insert(label, alert);
            }
            Err(e) => {
                warn!(label, error = %e, "Cluster processing failed, skipping");
                report.failed_clusters.push((label.to_string(), e.to_string()));
            }
        }
    }

    let mut alerts = Vec::with_capacity(items.len());
    for item in items {
        match enriched.get(item.label.as_str()) {
            Some(template) => {
                let mut alert = template.for_entry(item.entry.clone());
                alert.log_cluster = Some(item.label.clone());
                alerts.push(alert);
            }
            None => report.entries_skipped += 1,
        }
    }

    if !alerts.is_empty() {
        sink.persist(&alerts).await?;
    }
    report.alerts_persisted = alerts.len();

    info!(
        clusters = report.clusters,
        failed = report.failed_clusters.len(),
        persisted = report.alerts_persisted,
        skipped = report.entries_skipped,
        "Batch processed"
    );
    Ok(report)
}
