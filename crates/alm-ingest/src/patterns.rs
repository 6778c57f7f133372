//! Compiled regular expressions shared by the extractor.
//!
//! All patterns are case-sensitive: Ansible prints severity keywords in
//! lowercase, and an uppercase `FATAL:` is not a task result.

use once_cell::sync::Lazy;
use regex::Regex;

/// `fatal: [host]`, `error: [host]` or `failed: [host]`.
pub(crate) static SEVERITY_MARKER: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"\b(?P<severity>fatal|error|failed): \[(?P<host>[^\]\n]+)\]"));

/// A full error statement: severity marker, optional `(item=...)`, a `:` or
/// `=>` delimiter and a non-empty payload.
pub(crate) static ERROR_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    compile_regex(
        r"\b(?:fatal|error|failed): \[[^\]\n]+\](?: \(item=.*?\))?\s*(?:=>|:)\s*\S",
    )
});

/// Severity marker up to and including the `=>` that introduces the
/// structured result object, e.g. `fatal: [h]: FAILED! =>`.
pub(crate) static PAYLOAD_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    compile_regex(r"\b(?:fatal|error|failed): \[[^\]\n]+\](?: \(item=.*?\))?(?::[^\n]*?)?\s*=>")
});

/// Start of any per-host task result line (`ok: [h]`, `changed: [h]`, ...).
/// Bounds a payload so the next host's result is not swallowed into it.
pub(crate) static RESULT_LINE: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"(?m)^[ \t]*[a-z_]+: \[[^\]\n]+\]"));

/// One or more blank lines separating sections of a run log.
pub(crate) static SECTION_BREAK: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"\r?\n(?:[ \t]*\r?\n)+"));

/// Two or more consecutive backslashes.
pub(crate) static BACKSLASH_RUN: Lazy<Regex> = Lazy::new(|| compile_regex(r"\\{2,}"));

/// Only a `fatal: [host]` marker makes a log worth analysing.
pub(crate) static FATAL_MARKER: Lazy<Regex> = Lazy::new(|| compile_regex(r"fatal: \[.*?\]"));

/// An AAP job output block: header line, optional `profile_tasks`
/// timestamp line, optional first result line, then anything up to the
/// terminating blank line.
pub(crate) static AAP_BLOCK: Lazy<Regex> = Lazy::new(|| {
    compile_regex(concat!(
        r"(?m)^(?P<log_type>[A-Z ]+)(?: \[(?P<task_name>[^\]]+)\] ?\**$)",
        r"(?:\n^(?P<timestamp>\w+ \d{2} \w+ \d{4}  \d{2}:\d{2}:\d{2} \+\d{4}).*)?",
        r"(?:\n^(?P<status>\w+): \[(?P<host>[^\]]+)\])?",
        r"(?:[\w\W]*?\n\n)",
    ))
});

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}
