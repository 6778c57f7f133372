//! AAP job output block parsing.

use alm_types::LogBlock;

use crate::patterns::AAP_BLOCK;

/// Split AAP job output into task blocks.
///
/// A block starts at a `KEYWORD [name] ***` header and runs to the next blank
/// line. The optional `profile_tasks` timestamp line and the first
/// `status: [host]` line are captured when present. Text outside any header
/// is skipped.
pub fn parse_log_blocks(raw_text: &str) -> Vec<LogBlock> {
    // A trailing block is still terminated when the text lacks a blank line.
    let padded = format!("{raw_text}\n\n");

    AAP_BLOCK
        .captures_iter(&padded)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let capture = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());
            Some(LogBlock {
                raw: whole.as_str().trim_end_matches(['\n', '\r']).to_string(),
                log_type: capture("log_type").unwrap_or_default(),
                task_name: capture("task_name"),
                timestamp: capture("timestamp"),
                host: capture("host"),
                status: capture("status"),
            })
        })
        .collect()
}
