//! Error statement selection, level detection and payload extraction.

use tracing::debug;

use alm_types::{DetectedLevel, ErrorStatement};

use crate::normalize::{filter_ignoring, process_log_inference};
use crate::patterns::{ERROR_STATEMENT, PAYLOAD_DELIMITER, RESULT_LINE, SECTION_BREAK, SEVERITY_MARKER};

/// Severity keyword of an Ansible failure marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Error,
    Failed,
}

impl Severity {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "fatal" => Some(Severity::Fatal),
            "error" => Some(Severity::Error),
            "failed" => Some(Severity::Failed),
            _ => None,
        }
    }

    /// All severities collapse to a single output level.
    pub fn level(&self) -> DetectedLevel {
        DetectedLevel::Error
    }
}

/// Select error-bearing sections from a raw run log.
///
/// The text is split on blank lines. A section is selected when it contains
/// a `fatal:`, `error:` or `failed:` statement (`[host]`, optional
/// `(item=...)`, delimiter, payload) and does not carry `...ignoring`.
/// Selected sections are returned verbatim, in input order.
pub fn select_error_logs(raw_text: &str) -> Vec<String> {
    let selected: Vec<String> = SECTION_BREAK
        .split(raw_text)
        .filter(|section| !section.trim().is_empty())
        .filter(|section| ERROR_STATEMENT.is_match(section))
        .filter(|section| !filter_ignoring(section))
        .map(str::to_string)
        .collect();

    debug!(selected = selected.len(), "Selected error statements");
    selected
}

/// Severity of the first failure marker in the text.
pub fn detect_severity(statement: &str) -> Option<Severity> {
    SEVERITY_MARKER
        .captures(statement)
        .and_then(|caps| caps.name("severity"))
        .and_then(|m| Severity::from_keyword(m.as_str()))
}

/// Classify a statement: [`DetectedLevel::Error`] when it carries a failure
/// marker, [`DetectedLevel::Unknown`] otherwise.
pub fn detect_error_level(statement: &str) -> DetectedLevel {
    detect_severity(statement)
        .map(|severity| severity.level())
        .unwrap_or(DetectedLevel::Unknown)
}

/// Host named by the first failure marker.
pub fn extract_host(statement: &str) -> Option<String> {
    SEVERITY_MARKER
        .captures(statement)
        .and_then(|caps| caps.name("host"))
        .map(|m| m.as_str().to_string())
}

/// Extract the structured payload following the last failure marker's `=>`.
///
/// When several markers are present the last one wins, which prefers the
/// innermost error of concatenated statements.
///
/// The payload runs to the next host result line or the end of the text.
/// When it opens with `{`, it is cut after the last `}`; unbalanced payloads
/// are returned as-is. Text with no marker, or an empty payload, is returned
/// unchanged.
pub fn extract_error_from_log(statement: &str) -> String {
    let Some(last) = PAYLOAD_DELIMITER.find_iter(statement).last() else {
        return statement.to_string();
    };

    let rest = &statement[last.end()..];
    let rest = match RESULT_LINE.find(rest) {
        Some(next) => &rest[..next.start()],
        None => rest,
    };

    let payload = rest.trim();
    if payload.is_empty() {
        return statement.to_string();
    }

    if payload.starts_with('{') {
        if let Some(close) = payload.rfind('}') {
            return payload[..=close].to_string();
        }
    }
    payload.to_string()
}

/// Build a normalized statement from one selected section.
pub fn statement_from_raw(raw: &str) -> ErrorStatement {
    ErrorStatement::new(
        raw,
        detect_error_level(raw),
        process_log_inference(raw),
        extract_host(raw),
    )
}

/// Select and normalize every error statement in a raw run log.
pub fn extract_statements(raw_text: &str) -> Vec<ErrorStatement> {
    select_error_logs(raw_text)
        .iter()
        .map(|raw| statement_from_raw(raw))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FATAL_LINE: &str =
        r#"fatal: [host1.example.com]: FAILED! => {"msg": "Connection timeout", "rc": 1}"#;
    const ERROR_LINE: &str =
        r#"error: [host2.example.com]: UNREACHABLE! => {"msg": "SSH connection refused"}"#;
    const FAILED_LINE: &str =
        r#"failed: [host3.example.com] (item=package1) => {"msg": "Package not found", "rc": 127}"#;
    const SUCCESS_LINE: &str = r#"ok: [host1.example.com] => {"changed": false, "msg": "OK"}"#;

    fn multi_line_sample() -> String {
        [
            "TASK [Setup package manager] ************************************",
            "ok: [host1.example.com]",
            r#"fatal: [host2.example.com]: FAILED! => {"msg": "Package manager not found", "rc": 1}"#,
            r#"error: [host3.example.com]: UNREACHABLE! => {"msg": "Connection lost"}"#,
            r#"failed: [host4.example.com] (item=nginx) => {"msg": "Failed to install nginx"}"#,
            r#"ok: [host5.example.com] => {"changed": true}"#,
            r#"fatal: [host6.example.com]: FAILED! => {"msg": "Timeout"} ...ignoring"#,
        ]
        .join("\n\n")
    }

    #[test]
    fn test_select_each_severity_once() {
        let result = select_error_logs(&multi_line_sample());
        assert_eq!(result.len(), 3);

        let fatal: Vec<_> = result.iter().filter(|s| s.contains("fatal:")).collect();
        assert_eq!(fatal.len(), 1);
        assert!(fatal[0].contains("host2.example.com"));

        assert!(result.iter().any(|s| s.contains("error:") && s.contains("host3")));
        assert!(result.iter().any(|s| s.contains("failed:") && s.contains("host4")));
    }

    #[test]
    fn test_select_excludes_ignoring_and_success() {
        let result = select_error_logs(&multi_line_sample());
        assert!(result.iter().all(|s| !s.contains("...ignoring")));
        assert!(result.iter().all(|s| !s.trim().starts_with("ok:")));
    }

    #[test]
    fn test_select_empty_and_success_only() {
        assert!(select_error_logs("").is_empty());

        let success_only = concat!(
            "ok: [host1.example.com] => {\"changed\": false}\n\n",
            "ok: [host2.example.com] => {\"msg\": \"Success\"}\n\n",
            "changed: [host3.example.com] => {\"msg\": \"Updated\"}"
        );
        assert!(select_error_logs(success_only).is_empty());
    }

    #[test]
    fn test_select_preserves_original_format() {
        let special = "fatal: [special-host_01.sub.domain.com]: FAILED! => {\"msg\": \"Error with \\\"quotes\\\" and tabs\t\"}";
        let result = select_error_logs(special);
        assert_eq!(result, vec![special.to_string()]);

        assert_eq!(select_error_logs(FATAL_LINE), vec![FATAL_LINE.to_string()]);
    }

    #[test]
    fn test_select_scenario_ok_then_fatal() {
        let result = select_error_logs("ok: [h1]\n\nfatal: [h2]: FAILED! => {}");
        assert_eq!(result.len(), 1);
        assert!(result[0].contains("h2"));
    }

    #[test]
    fn test_select_is_case_sensitive() {
        assert!(select_error_logs(r#"FATAL: [h]: FAILED! => {"msg": "x"}"#).is_empty());
    }

    #[test]
    fn test_select_keeps_task_block_together() {
        let raw = concat!(
            "TASK [Install nginx] ***\n",
            "fatal: [web1]: FAILED! => {\"msg\": \"No package nginx available.\"}\n",
            "ok: [web2]\n",
            "\n",
            "PLAY RECAP ***\n",
            "web1 : ok=3 failed=1\n"
        );
        let result = select_error_logs(raw);
        assert_eq!(result.len(), 1);
        assert!(result[0].starts_with("TASK [Install nginx]"));
        assert!(result[0].contains("ok: [web2]"));
    }

    #[test]
    fn test_select_splits_on_runs_of_blank_lines() {
        let raw = "PLAY [x] ***\n\n\nTASK [y] ***\n\t\n\r\nfatal: [h]: FAILED! => {\"msg\": \"boom\"}\n";
        let result = select_error_logs(raw);
        assert_eq!(result, vec!["fatal: [h]: FAILED! => {\"msg\": \"boom\"}\n".to_string()]);

        let raw = "PLAY [x] ***\n\n\nTASK [y] ***\nfatal: [h]: FAILED! => {\"msg\": \"boom\"}\n";
        let statements = extract_statements(raw);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].raw.starts_with("TASK [y]"));
        assert_eq!(statements[0].message, r#"{"msg": "boom"}"#);
    }

    #[test]
    fn test_detect_level() {
        assert_eq!(detect_error_level(FATAL_LINE), DetectedLevel::Error);
        assert_eq!(detect_error_level(ERROR_LINE), DetectedLevel::Error);
        assert_eq!(detect_error_level(FAILED_LINE), DetectedLevel::Error);
        assert_eq!(detect_error_level(SUCCESS_LINE), DetectedLevel::Unknown);
        assert_eq!(detect_error_level("changed: [h] => {}"), DetectedLevel::Unknown);
        assert_eq!(detect_error_level(""), DetectedLevel::Unknown);
        assert_eq!(
            detect_error_level("This is just a random message without errors"),
            DetectedLevel::Unknown
        );
        assert_eq!(
            detect_error_level(r#"FATAL: [host]: FAILED! => {"msg": "error"}"#),
            DetectedLevel::Unknown
        );
    }

    #[test]
    fn test_detect_severity_uses_first_occurrence() {
        let text = r#"failed: [a] (item=x) => {} fatal: [b]: FAILED! => {}"#;
        assert_eq!(detect_severity(text), Some(Severity::Failed));
        assert_eq!(
            detect_error_level(r#"error: [host]: error: [host2]: FAILED! => {"msg": "nested"}"#),
            DetectedLevel::Error
        );
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host(FATAL_LINE).as_deref(), Some("host1.example.com"));
        assert_eq!(
            extract_host(r#"fatal: [2001:db8::1]: FAILED! => {"msg": "x"}"#).as_deref(),
            Some("2001:db8::1")
        );
        assert_eq!(extract_host(SUCCESS_LINE), None);
    }

    #[test]
    fn test_extract_payload() {
        assert_eq!(
            extract_error_from_log(FATAL_LINE),
            r#"{"msg": "Connection timeout", "rc": 1}"#
        );
        assert!(extract_error_from_log(FAILED_LINE).contains("Package not found"));
        assert!(extract_error_from_log(
            r#"error: [host]: CHANGED! => {"msg": "Path: /var/log/\"test\".log", "rc": 0}"#
        )
        .contains("Path:"));
        assert!(extract_error_from_log(r#"fatal: [2001:db8::1]: FAILED! => {"msg": "IPv6 host error"}"#)
            .contains("IPv6 host error"));
    }

    #[test]
    fn test_extract_pass_through() {
        let weird = "This is not a standard Ansible log format";
        assert_eq!(extract_error_from_log(weird), weird);
        assert_eq!(extract_error_from_log(""), "");
        assert_eq!(extract_error_from_log(SUCCESS_LINE), SUCCESS_LINE);
        assert_eq!(extract_error_from_log("fatal: [h]: FAILED! =>"), "fatal: [h]: FAILED! =>");
    }

    #[test]
    fn test_extract_multiline_payload() {
        let log = concat!(
            "fatal: [host1.example.com]: FAILED! => {\n",
            "    \"msg\": \"This is a multiline error message\",\n",
            "    \"details\": {\n",
            "        \"code\": 500,\n",
            "        \"error\": \"Internal Server Error\"\n",
            "    }\n",
            "}"
        );
        let result = extract_error_from_log(log);
        assert!(result.starts_with('{') && result.ends_with('}'));
        assert!(result.contains("multiline error message"));
        assert!(result.contains("Internal Server Error"));
    }

    #[test]
    fn test_extract_takes_last_match() {
        let nested = r#"fatal: [host1]: FAILED! => {"outer": "error"} fatal: [host2]: FAILED! => {"inner": "error"}"#;
        assert_eq!(extract_error_from_log(nested), r#"{"inner": "error"}"#);
    }

    #[test]
    fn test_extract_stops_at_next_host_result() {
        let block = concat!(
            "TASK [Install nginx] ***\n",
            "fatal: [web1]: FAILED! => {\"msg\": \"No package\"}\n",
            "ok: [web2] => {\"changed\": false}\n"
        );
        assert_eq!(extract_error_from_log(block), r#"{"msg": "No package"}"#);
    }

    #[test]
    fn test_extract_tolerates_malformed_payloads() {
        let malformed = r#"fatal: [host]: FAILED! => {"msg": broken json here"#;
        assert_eq!(extract_error_from_log(malformed), r#"{"msg": broken json here"#);
        assert_eq!(extract_error_from_log("fatal: [host]: FAILED! => {}"), "{}");
        assert_eq!(extract_error_from_log("fatal: [h]: FAILED! => }{"), "}{");
    }

    #[test]
    fn test_extract_unicode_safe() {
        let log = r#"fatal: [サーバー.example.com]: FAILED! => {"msg": "Error: 文字化け 🔥"}"#;
        assert_eq!(extract_error_from_log(log), r#"{"msg": "Error: 文字化け 🔥"}"#);
        assert_eq!(extract_host(log).as_deref(), Some("サーバー.example.com"));
    }

    #[test]
    fn test_extract_various_hosts() {
        for host in [
            "simple",
            "host.domain.com",
            "host-with-dashes",
            "host_with_underscores",
            "192.168.1.1",
            "host123",
            "UPPERCASE.HOST",
        ] {
            let log = format!(r#"fatal: [{host}]: FAILED! => {{"msg": "test error for {host}"}}"#);
            assert!(
                extract_error_from_log(&log).contains(&format!("test error for {host}")),
                "host: {host}"
            );
        }
    }

    #[test]
    fn test_extract_statements_workflow() {
        let statements = extract_statements(&multi_line_sample());
        assert_eq!(statements.len(), 3);
        for stmt in &statements {
            assert_eq!(stmt.level, DetectedLevel::Error);
            assert!(!stmt.message.is_empty());
            assert!(stmt.message.chars().count() <= 5000);
            assert!(stmt.host.is_some());
        }
        assert_eq!(statements[0].host.as_deref(), Some("host2.example.com"));
    }

    #[test]
    fn test_statement_from_task_block_extracts_payload() {
        let raw = "TASK [Install] ***\nfatal: [web1]: FAILED! => {\"msg\": \"No package nginx\"}";
        let stmt = statement_from_raw(raw);
        assert_eq!(stmt.message, r#"{"msg": "No package nginx"}"#);
        assert_eq!(stmt.host.as_deref(), Some("web1"));
        assert_eq!(stmt.raw, raw);
    }
}
