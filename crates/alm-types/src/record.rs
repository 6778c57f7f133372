//! Knowledge-base record served by the RAG index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata record stored in the index side-table (`error_store`).
///
/// Only `error_message` is required; fields the build job adds beyond the
/// known ones are kept in `extra` so nothing is lost on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Short title of the known error
    #[serde(default)]
    pub error_title: Option<String>,

    /// Original error text the vector was built from
    #[serde(alias = "error", alias = "message")]
    pub error_message: String,

    /// Known remediation
    #[serde(default)]
    pub solution: Option<String>,

    /// Team/category the error belongs to
    #[serde(default)]
    pub category: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorRecord {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_title: None,
            error_message: error_message.into(),
            solution: None,
            category: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.error_title = Some(title.into());
        self
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
