// src/changes/mod.rs
//! Line-level change computation between an original file and its fix.
//!
//! The default comparison is positional: line N of the original against line
//! N of the fix, no alignment. An insertion near the top therefore shows up as
//! a run of `modified` lines. [`aligned_line_changes`] offers an LCS-based view
//! for callers that want it.

pub mod diff;

use serde::{Deserialize, Serialize};
use similar::{DiffOp, TextDiff};

pub const NO_CHANGES_EXPLANATION: &str = "No changes needed";

const ERROR_HANDLING_MARKERS: [&str; 4] = ["try:", "try {", "catch (", "except "];
const TYPE_ANNOTATION_MARKER: &str = "->";
const PRESERVED_SIZE_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    /// 1-based
    pub line_number: usize,
    pub original: String,
    pub fixed: String,
    pub change_type: ChangeKind,
}

/// How much weight to give the optimization tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Content heuristics only, not verified analysis
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub line_changes: Vec<LineChange>,
    pub explanation: String,
    pub optimizations: Vec<String>,
}

pub fn compute(original: &str, fixed: &str, issues: &[String]) -> ChangeSet {
    ChangeSet {
        line_changes: line_changes(original, fixed),
        explanation: fix_explanation(original, fixed, issues.len()),
        optimizations: detect_optimizations(original, fixed),
    }
}

/// Positional comparison; a missing line on either side counts as empty.
pub fn line_changes(original: &str, fixed: &str) -> Vec<LineChange> {
    let original_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let max_lines = original_lines.len().max(fixed_lines.len());

    (0..max_lines)
        .filter_map(|i| {
            let orig = original_lines.get(i).copied().unwrap_or("");
            let new = fixed_lines.get(i).copied().unwrap_or("");
            if orig == new {
                return None;
            }
            let change_type = match (orig.is_empty(), new.is_empty()) {
                (false, false) => ChangeKind::Modified,
                (true, _) => ChangeKind::Added,
                (false, true) => ChangeKind::Removed,
            };
            Some(LineChange {
                line_number: i + 1,
                original: orig.to_string(),
                fixed: new.to_string(),
                change_type,
            })
        })
        .collect()
}

/// LCS-aligned comparison. Replaced runs pair up as `modified`; the rest are
/// `added` (numbered by the fixed side) or `removed` (numbered by the original side).
pub fn aligned_line_changes(original: &str, fixed: &str) -> Vec<LineChange> {
    let original_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let diff = TextDiff::from_slices(original_lines.as_slice(), fixed_lines.as_slice());

    let mut changes = Vec::new();
    for op in diff.ops() {
        match *op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete { old_index, old_len, .. } => {
                for i in old_index..old_index + old_len {
                    changes.push(removed(i, original_lines[i]));
                }
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                for i in new_index..new_index + new_len {
                    changes.push(added(i, fixed_lines[i]));
                }
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                let paired = old_len.min(new_len);
                for k in 0..paired {
                    changes.push(LineChange {
                        line_number: new_index + k + 1,
                        original: original_lines[old_index + k].to_string(),
                        fixed: fixed_lines[new_index + k].to_string(),
                        change_type: ChangeKind::Modified,
                    });
                }
                for i in old_index + paired..old_index + old_len {
                    changes.push(removed(i, original_lines[i]));
                }
                for i in new_index + paired..new_index + new_len {
                    changes.push(added(i, fixed_lines[i]));
                }
            }
        }
    }
    changes
}

fn added(index: usize, line: &str) -> LineChange {
    LineChange {
        line_number: index + 1,
        original: String::new(),
        fixed: line.to_string(),
        change_type: ChangeKind::Added,
    }
}

fn removed(index: usize, line: &str) -> LineChange {
    LineChange {
        line_number: index + 1,
        original: line.to_string(),
        fixed: String::new(),
        change_type: ChangeKind::Removed,
    }
}

pub fn fix_explanation(original: &str, fixed: &str, issue_count: usize) -> String {
    if original == fixed {
        return NO_CHANGES_EXPLANATION.to_string();
    }
    // Pairs beyond the shorter side are not counted
    let modified = original
        .lines()
        .zip(fixed.lines())
        .filter(|(o, f)| o != f)
        .count();
    format!(
        "Fixed {} issue(s) with {} line modifications using automated remediation",
        issue_count, modified
    )
}

/// Best-effort tags for improvements beyond the reported issues. These are
/// content heuristics; see [`Confidence::Heuristic`].
pub fn detect_optimizations(original: &str, fixed: &str) -> Vec<String> {
    let mut optimizations = Vec::new();

    let handles_errors = |code: &str| ERROR_HANDLING_MARKERS.iter().any(|m| code.contains(m));
    if handles_errors(fixed) && !handles_errors(original) {
        optimizations.push("Added error handling with try-except blocks".to_string());
    }

    if fixed.contains(TYPE_ANNOTATION_MARKER) && !original.contains(TYPE_ANNOTATION_MARKER) {
        optimizations.push("Added type hints for better code clarity".to_string());
    }

    if fixed.len() as f64 > original.len() as f64 * PRESERVED_SIZE_RATIO {
        optimizations.push("Improved code structure and readability".to_string());
    }

    optimizations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_no_changes() {
        let code = "a\nb\nc\n";
        let set = compute(code, code, &["x".into()]);
        assert!(set.line_changes.is_empty());
        assert_eq!(set.explanation, NO_CHANGES_EXPLANATION);
    }

    #[test]
    fn appended_lines_are_added() {
        let changes = line_changes("a\nb\nc\n", "a\nb\nc\nd\ne\n");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].line_number, 4);
        assert_eq!(changes[1].line_number, 5);
        assert!(changes.iter().all(|c| c.change_type == ChangeKind::Added));
        assert_eq!(changes[1].fixed, "e");
        assert_eq!(changes[1].original, "");
    }

    #[test]
    fn truncated_lines_are_removed() {
        let changes = line_changes("a\nb\nc", "a");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_type, ChangeKind::Removed);
        assert_eq!(changes[0].line_number, 2);
        assert_eq!(changes[1].original, "c");
    }

    #[test]
    fn positional_diff_reports_shift_as_modifications() {
        let changes = line_changes("a\nb\nc", "new\na\nb\nc");
        let kinds: Vec<_> = changes.iter().map(|c| c.change_type).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Modified, ChangeKind::Modified, ChangeKind::Modified, ChangeKind::Added]
        );
    }

    #[test]
    fn blanked_line_counts_as_removed_and_filled_blank_as_added() {
        let changes = line_changes("x\n\nz", "\ny\nz");
        assert_eq!(changes[0].change_type, ChangeKind::Removed);
        assert_eq!(changes[1].change_type, ChangeKind::Added);
    }

    #[test]
    fn aligned_view_sees_a_single_insertion() {
        let changes = aligned_line_changes("a\nb\nc", "new\na\nb\nc");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeKind::Added);
        assert_eq!(changes[0].line_number, 1);
        assert_eq!(changes[0].fixed, "new");
    }

    #[test]
    fn aligned_view_pairs_replacements() {
        let changes = aligned_line_changes("a\nold\nc\nd", "a\nnew\nc");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_type, ChangeKind::Modified);
        assert_eq!((changes[0].original.as_str(), changes[0].fixed.as_str()), ("old", "new"));
        assert_eq!(changes[1].change_type, ChangeKind::Removed);
        assert_eq!(changes[1].line_number, 4);
    }

    #[test]
    fn explanation_counts_paired_lines_only() {
        let explanation = fix_explanation("a\nb\nc", "a\nB\nc\nd\ne", 2);
        assert_eq!(
            explanation,
            "Fixed 2 issue(s) with 1 line modifications using automated remediation"
        );
    }

    #[test]
    fn optimization_heuristics() {
        let original = "def f(x):\n    return 1 / x\n";
        let fixed = "def f(x: float) -> float:\n    try:\n        return 1 / x\n    except ZeroDivisionError:\n        return 0.0\n";
        assert_eq!(
            detect_optimizations(original, fixed),
            vec![
                "Added error handling with try-except blocks",
                "Added type hints for better code clarity",
                "Improved code structure and readability",
            ]
        );

        // Shrinking below 90% of the original drops the structure tag
        assert!(detect_optimizations("0123456789", "012345678").is_empty());
        // Existing error handling is not re-credited
        assert!(
            !detect_optimizations("try:\n  x\n", "try:\n  x\nexcept:\n  y\n")
                .iter()
                .any(|o| o.contains("error handling"))
        );
    }

    #[test]
    fn change_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChangeKind::Modified).unwrap(), "\"modified\"");
        assert_eq!(serde_json::to_string(&Confidence::Heuristic).unwrap(), "\"heuristic\"");
    }
}
