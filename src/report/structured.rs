// src/report/structured.rs
//! JSON scan reports.
//!
//! Accepts any object carrying a `findings`, `issues` or `results` array. Each
//! tool names its fields differently, so file and message are looked up through
//! ordered lists of alternate keys.

use serde_json::{Map, Value};

use super::{DEFAULT_FILE, IssueMap, truncate_chars};

const COLLECTION_KEYS: [&str; 3] = ["findings", "issues", "results"];
const FILE_KEYS: [&str; 4] = ["file", "file_path", "path", "location"];
const MESSAGE_KEYS: [&str; 5] = ["issue", "message", "issue_description", "description", "title"];

const SNIPPET_CHARS: usize = 50;
const PLACEHOLDER_MESSAGE: &str = "Code quality improvement needed";

pub fn parse_json(text: &str) -> Option<IssueMap> {
    let data: Value = serde_json::from_str(text).ok()?;
    let report = data.as_object()?;

    // The first collection key present wins, even if a later one has entries
    let findings = COLLECTION_KEYS
        .iter()
        .find_map(|key| report.get(*key))?
        .as_array()?;

    let mut issues = IssueMap::new();
    for finding in findings.iter().filter_map(Value::as_object) {
        let file = first_text(finding, &FILE_KEYS).unwrap_or_else(|| DEFAULT_FILE.to_string());
        issues.push(file, describe(finding));
    }

    issues.non_empty()
}

fn describe(finding: &Map<String, Value>) -> String {
    if let Some(mut message) = first_text(finding, &MESSAGE_KEYS) {
        if let Some(line) = finding.get("line").and_then(scalar_text) {
            message = format!("Line {}: {}", line, message);
        }
        if let Some(severity) = finding.get("severity").and_then(scalar_text) {
            message = format!("[{}] {}", severity, message);
        }
        return message;
    }

    let suggested = finding.get("suggested_fix").and_then(scalar_text);
    let original = finding.get("original_code").and_then(scalar_text);
    match (original, suggested) {
        (Some(original), Some(suggested)) => format!(
            "Code improvement: {}... → {}...",
            truncate_chars(&original, SNIPPET_CHARS),
            truncate_chars(&suggested, SNIPPET_CHARS)
        ),
        _ => PLACEHOLDER_MESSAGE.to_string(),
    }
}

fn first_text(finding: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| finding.get(*key).and_then(scalar_text))
}

/// Render a scalar field, treating empty strings and zero as absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
