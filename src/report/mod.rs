// src/report/mod.rs
//! Scan report ingestion.
//!
//! Reports come from unknown external tools with no declared schema, so the
//! format is detected purely by structure: each decoder is tried in priority
//! order and the first one that parses *and* yields at least one issue wins.

mod document;
mod markup;
mod structured;
mod tabular;
mod text;

pub use document::extract_pdf_text;
pub use markup::parse_xml;
pub use structured::parse_json;
pub use tabular::parse_csv;
pub use text::parse_text;

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info};

/// File used when a report entry names no file at all
pub const DEFAULT_FILE: &str = "main.py";

/// Issue recorded when nothing in the report could be recognized
pub const DEFAULT_ISSUE: &str = "Code review needed";

/// Report path → issue descriptions, in first-seen order.
///
/// Keys are never empty. Issues keep report order and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueMap {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl IssueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single synthetic entry returned for unrecognizable reports.
    pub fn default_review() -> Self {
        let mut map = Self::new();
        map.push(DEFAULT_FILE, DEFAULT_ISSUE);
        map
    }

    /// Append an issue for `path`. Empty paths are filed under [`DEFAULT_FILE`].
    pub fn push(&mut self, path: impl Into<String>, issue: impl Into<String>) {
        let mut path = path.into();
        if path.trim().is_empty() {
            path = DEFAULT_FILE.to_string();
        }
        match self.index.get(&path) {
            Some(&idx) => self.entries[idx].1.push(issue.into()),
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, vec![issue.into()]));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.index.get(path).map(|&idx| self.entries[idx].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(path, issues)| (path.as_str(), issues.as_slice()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    /// Number of distinct report paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total issues across all paths
    pub fn issue_count(&self) -> usize {
        self.entries.iter().map(|(_, issues)| issues.len()).sum()
    }

    /// `Some(self)` when at least one issue was collected
    pub(crate) fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl Serialize for IssueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, issues) in &self.entries {
            map.serialize_entry(path, issues)?;
        }
        map.end()
    }
}

type Decoder = fn(&str) -> Option<IssueMap>;

/// Text decoders, highest priority first
const TEXT_DECODERS: [(&str, Decoder); 4] = [
    ("json", parse_json),
    ("xml", parse_xml),
    ("csv", parse_csv),
    ("text", parse_text),
];

/// Normalize a scan report into an [`IssueMap`]. Never fails.
///
/// `bytes` is the raw upload (tried as a PDF first); `text` is the same upload
/// decoded as UTF-8, when that was possible.
pub fn parse_scan_report(text: Option<&str>, bytes: Option<&[u8]>) -> IssueMap {
    debug!(
        "Parsing scan report: {}",
        text.map(|t| preview(t, 200)).unwrap_or_else(|| "binary data".into())
    );

    if let Some(extracted) = bytes.and_then(extract_pdf_text) {
        if let Some(map) = parse_text_report(&extracted) {
            info!(files = map.len(), issues = map.issue_count(), "Parsed PDF scan report");
            return map;
        }
    }

    if let Some(map) = text.and_then(parse_text_report) {
        return map;
    }

    info!("No valid report format detected, using default review entry");
    IssueMap::default_review()
}

/// Run the text decoders in order and return the first non-empty result.
pub fn parse_text_report(text: &str) -> Option<IssueMap> {
    if text.trim().is_empty() {
        return None;
    }
    for (format, decode) in TEXT_DECODERS {
        if let Some(map) = decode(text) {
            info!(format, files = map.len(), issues = map.issue_count(), "Parsed scan report");
            return Some(map);
        }
        debug!(format, "Format did not match");
    }
    None
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Cut `text` to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
