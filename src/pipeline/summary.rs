// src/pipeline/summary.rs
//! Response-facing views of a run: per-file summaries, the persisted review
//! record, and the report/repository consistency check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChangeRecord;
use crate::changes::{ChangeKind, LineChange};
use crate::error::RepoMismatch;

pub const NO_CHANGES_DIFF: &str = "No changes made";

/// One entry of the `change_report` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Repository-relative path
    pub file: String,
    pub issues_fixed: Vec<String>,
    pub fix_explanation: String,
    pub optimizations: Vec<String>,
    pub total_lines_changed: usize,
    pub line_changes: Vec<LineChange>,
    /// `Line N: - old` / `Line N: + new` lines
    pub diff: String,
}

pub fn summarize(records: &[ChangeRecord]) -> Vec<ChangeSummary> {
    records
        .iter()
        .map(|record| ChangeSummary {
            file: record.full_path.clone(),
            issues_fixed: record.issues_fixed.clone(),
            fix_explanation: record.fix_explanation.clone(),
            optimizations: record.optimizations.clone(),
            total_lines_changed: record.total_lines_changed,
            line_changes: record.line_changes.clone(),
            diff: compact_diff(&record.line_changes),
        })
        .collect()
}

/// Line-numbered before/after listing; a modification contributes both sides.
pub fn compact_diff(line_changes: &[LineChange]) -> String {
    let mut lines = Vec::new();
    for change in line_changes {
        let n = change.line_number;
        match change.change_type {
            ChangeKind::Modified => {
                lines.push(format!("Line {}: - {}", n, change.original));
                lines.push(format!("Line {}: + {}", n, change.fixed));
            }
            ChangeKind::Added => lines.push(format!("Line {}: + {}", n, change.fixed)),
            ChangeKind::Removed => lines.push(format!("Line {}: - {}", n, change.original)),
        }
    }

    if lines.is_empty() {
        NO_CHANGES_DIFF.to_string()
    } else {
        lines.join("\n")
    }
}

/// What gets persisted for a finished review. Both payloads are JSON text so
/// the storage layer needs no knowledge of their shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub original_repo_url: String,
    pub updated_repo_url: String,
    pub scan_report: Option<String>,
    /// Serialized `Vec<ChangeSummary>`
    pub changes_summary: String,
    /// Serialized `Vec<ChangeRecord>`
    pub diff_content: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(
        original_repo_url: impl Into<String>,
        updated_repo_url: impl Into<String>,
        scan_report: Option<String>,
        records: &[ChangeRecord],
    ) -> serde_json::Result<Self> {
        Ok(Self {
            original_repo_url: original_repo_url.into(),
            updated_repo_url: updated_repo_url.into(),
            scan_report,
            changes_summary: serde_json::to_string(&summarize(records))?,
            diff_content: serde_json::to_string(records)?,
            created_at: Utc::now(),
        })
    }
}

/// If the report is a JSON object carrying a `repo_url`, it must name the
/// repository being fixed. Reports without one always pass.
pub fn verify_report_repo(report_text: &str, repo_url: &str) -> Result<(), RepoMismatch> {
    let Ok(serde_json::Value::Object(report)) = serde_json::from_str::<serde_json::Value>(report_text) else {
        return Ok(());
    };
    let Some(report_url) = report.get("repo_url").and_then(|v| v.as_str()) else {
        return Ok(());
    };
    if report_url.trim().is_empty() || normalize_repo_url(report_url) == normalize_repo_url(repo_url) {
        return Ok(());
    }
    Err(RepoMismatch {
        input: repo_url.to_string(),
        report: report_url.to_string(),
    })
}

fn normalize_repo_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url).to_lowercase()
}
