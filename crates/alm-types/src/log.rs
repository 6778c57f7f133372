//! Log statement types.
//!
//! A raw Ansible run log is split into [`LogBlock`]s; error-bearing blocks
//! become [`ErrorStatement`]s after level detection and normalization.

use serde::{Deserialize, Serialize};

/// Upper bound (in characters) on a normalized statement message.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Coarse severity classification of a statement.
///
/// Ansible's `fatal:`, `error:` and `failed:` markers all collapse to
/// [`DetectedLevel::Error`]; there is no separate fatal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectedLevel {
    Error,
    Warn,
    Info,
    Debug,
    #[default]
    Unknown,
}

impl DetectedLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedLevel::Error => "error",
            DetectedLevel::Warn => "warn",
            DetectedLevel::Info => "info",
            DetectedLevel::Debug => "debug",
            DetectedLevel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DetectedLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous, blank-line delimited section of a raw log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBlock {
    /// Raw block text, verbatim
    pub raw: String,
    /// Header keyword (e.g. `TASK`, `PLAY RECAP`)
    pub log_type: String,
    /// Bracketed name following the header keyword
    #[serde(default)]
    pub task_name: Option<String>,
    /// Timestamp line emitted by the `profile_tasks` callback
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Host the first status line refers to
    #[serde(default)]
    pub host: Option<String>,
    /// Status keyword of the first status line (`ok`, `fatal`, ...)
    #[serde(default)]
    pub status: Option<String>,
}

/// One extracted candidate error statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStatement {
    /// Statement text as it appeared in the log
    pub raw: String,
    /// Detected severity
    pub level: DetectedLevel,
    /// Normalized message, at most [`MAX_MESSAGE_CHARS`] characters
    pub message: String,
    /// Host from the severity marker, when parseable
    #[serde(default)]
    pub host: Option<String>,
}

impl ErrorStatement {
    pub fn new(
        raw: impl Into<String>,
        level: DetectedLevel,
        message: impl Into<String>,
        host: Option<String>,
    ) -> Self {
        Self {
            raw: raw.into(),
            level,
            message: message.into(),
            host,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == DetectedLevel::Error
    }
}
