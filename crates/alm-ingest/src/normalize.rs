//! Per-message cleaning: escape collapsing and truncation.
//!
//! Two modes are offered. [`preprocess_log`] extracts the structured
//! payload first; [`preprocess_log_without_extraction`] keeps the whole
//! statement, host and status prefix included. [`process_log_inference`]
//! picks between them.

use regex::NoExpand;

use alm_types::MAX_MESSAGE_CHARS;

use crate::extract::extract_error_from_log;
use crate::patterns::BACKSLASH_RUN;

/// Marker Ansible appends to a failure it was told to disregard.
pub const IGNORING_MARKER: &str = "...ignoring";

/// Collapse backslash runs and unescape double quotes.
///
/// Any run of two or more backslashes becomes a single backslash, then
/// `\"` becomes `"`. Single backslashes elsewhere are left alone. The
/// output contains neither a backslash run nor `\"`, so applying this
/// twice is the same as applying it once.
pub fn clean_slash(text: &str) -> String {
    BACKSLASH_RUN
        .replace_all(text, NoExpand("\\"))
        .replace("\\\"", "\"")
}

/// Strip surrounding whitespace and cap the result at
/// [`MAX_MESSAGE_CHARS`] characters.
///
/// No ellipsis is appended. An over-long input always yields exactly
/// [`MAX_MESSAGE_CHARS`] characters, even when the cut lands on whitespace.
pub fn slice_log_message(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((cut, _)) => trimmed[..cut].to_string(),
        None => trimmed.to_string(),
    }
}

/// Extract, clean, then bound a statement.
pub fn preprocess_log(statement: &str) -> String {
    slice_log_message(&clean_slash(&extract_error_from_log(statement)))
}

/// Clean and bound a statement, keeping its full structure.
pub fn preprocess_log_without_extraction(statement: &str) -> String {
    slice_log_message(&clean_slash(statement))
}

/// Normalize a statement for inference.
///
/// Whole task blocks (text starting with `TASK`) carry their header and
/// sibling host results around the failure, so the payload is extracted.
/// Anything else is already a single result line whose host/status prefix
/// is informative, so it is kept.
pub fn process_log_inference(statement: &str) -> String {
    if statement.is_empty() {
        return String::new();
    }
    if statement.starts_with("TASK") {
        preprocess_log(statement)
    } else {
        preprocess_log_without_extraction(statement)
    }
}

/// Whether the text carries Ansible's `...ignoring` marker (exact case).
pub fn filter_ignoring(text: &str) -> bool {
    text.contains(IGNORING_MARKER)
}
