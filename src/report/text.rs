// src/report/text.rs
// Free-form text reports, one finding per line

use once_cell::sync::Lazy;
use regex::Regex;

use super::{DEFAULT_FILE, IssueMap};

/// `path.ext: message` or `path.ext | message`
static PATH_THEN_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+\.\w+)\s*[:|]\s*(.+)").expect("valid regex"));

/// Any path-like token somewhere in the line
static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w/\\.-]+\.\w+").expect("valid regex"));

pub fn parse_text(text: &str) -> Option<IssueMap> {
    let mut issues = IssueMap::new();

    for line in text.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = PATH_THEN_MESSAGE.captures(line) {
            let file = caps[1].trim();
            let message = caps[2].trim();
            if !file.is_empty() && !message.is_empty() {
                issues.push(file, message);
                continue;
            }
        }

        let file = PATH_TOKEN
            .find(line)
            .map(|m| m.as_str())
            .unwrap_or(DEFAULT_FILE);
        issues.push(file, line);
    }

    issues.non_empty()
}
