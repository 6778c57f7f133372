//! # alm-ingest
//!
//! Turns raw Ansible run logs into normalized error statements.
//!
//! Everything here is a pure function over `&str`: no shared state, no I/O,
//! and no failure mode. Malformed input degrades to a best-effort
//! pass-through value so one bad entry never stops a batch.
//!
//! ## Pipeline
//! 1. [`select_error_logs`] picks blank-line delimited sections carrying a
//!    `fatal:`/`error:`/`failed:` marker, dropping `...ignoring` ones
//! 2. [`detect_error_level`] classifies each section
//! 3. [`process_log_inference`] extracts and/or normalizes the message

pub mod blocks;
pub mod checks;
pub mod extract;
pub mod normalize;
mod patterns;

pub use blocks::parse_log_blocks;
pub use checks::should_ignore;
pub use extract::{
    detect_error_level, detect_severity, extract_error_from_log, extract_host, extract_statements,
    select_error_logs, statement_from_raw, Severity,
};
pub use normalize::{
    clean_slash, filter_ignoring, preprocess_log, preprocess_log_without_extraction,
    process_log_inference, slice_log_message, IGNORING_MARKER,
};
