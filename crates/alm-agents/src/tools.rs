//! Stateless log tools.
//!
//! Handlers receive their per-alert context as an explicit
//! [`LogToolContext`] argument instead of capturing it.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use alm_types::{Alert, LogEntry};

use crate::capabilities::{LogSource, TimeRange};
use crate::error::AgentError;

/// Lines returned by [`log_lines_above`] when the caller has no preference.
pub const DEFAULT_LINES_ABOVE: usize = 10;

/// How far back a file query reaches from the alert timestamp.
pub const CONTEXT_WINDOW_DAYS_BEFORE: i64 = 25;

/// How far past the alert timestamp a file query reaches.
pub const CONTEXT_WINDOW_MINUTES_AFTER: i64 = 2;

/// The alert a tool call is about.
#[derive(Debug, Clone, PartialEq)]
pub struct LogToolContext {
    pub file_name: String,
    pub log_message: String,
    pub log_timestamp: DateTime<Utc>,
}

impl LogToolContext {
    pub fn new(
        file_name: impl Into<String>,
        log_message: impl Into<String>,
        log_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            log_message: log_message.into(),
            log_timestamp,
        }
    }

    /// `None` when the log store did not label the entry with its file.
    pub fn from_alert(alert: &Alert) -> Option<Self> {
        let entry = &alert.log_entry;
        Some(Self::new(
            entry.file_name()?,
            entry.message.clone(),
            entry.timestamp,
        ))
    }

    /// Window searched around the alert.
    pub fn window(&self) -> TimeRange {
        TimeRange::new(
            self.log_timestamp - Duration::days(CONTEXT_WINDOW_DAYS_BEFORE),
            self.log_timestamp + Duration::minutes(CONTEXT_WINDOW_MINUTES_AFTER),
        )
    }
}

/// LogQL selector for every line of a file, matched by path suffix.
pub fn file_name_query(file_name: &str) -> String {
    format!("{{filename=~\".*{}$\"}}", escape_logql_regex(file_name))
}

fn escape_logql_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' => {
                out.push_str("\\\\");
                out.push(c);
            }
            '\\' => out.push_str("\\\\\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Result of [`log_lines_above`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogLinesAbove {
    /// LogQL query that was issued
    pub query: String,
    /// Lines preceding the alert line, oldest first
    pub lines: Vec<LogEntry>,
    /// Whether the alert line itself was found in the file
    pub target_found: bool,
}

/// Up to `n` lines of the alert's file immediately preceding the alert line.
///
/// When the alert line cannot be located, the last `n` lines at or before
/// the alert timestamp are returned instead.
pub async fn log_lines_above(
    ctx: &LogToolContext,
    source: &dyn LogSource,
    n: usize,
) -> Result<LogLinesAbove, AgentError> {
    if ctx.file_name.trim().is_empty() {
        return Err(AgentError::InvalidInput("file_name must be set".to_string()));
    }

    let query = file_name_query(&ctx.file_name);
    let mut entries = source.fetch_logs(&query, ctx.window()).await?;
    entries.sort_by_key(|e| e.timestamp);

    let target = entries
        .iter()
        .rposition(|e| e.message.trim() == ctx.log_message.trim());

    let (preceding, target_found) = match target {
        Some(pos) => (&entries[..pos], true),
        None => {
            let end = entries.partition_point(|e| e.timestamp <= ctx.log_timestamp);
            (&entries[..end], false)
        }
    };
    let lines = preceding[preceding.len().saturating_sub(n)..].to_vec();

    debug!(
        file = %ctx.file_name,
        fetched = entries.len(),
        returned = lines.len(),
        target_found,
        "Fetched log lines above"
    );
    Ok(LogLinesAbove {
        query,
        lines,
        target_found,
    })
}
