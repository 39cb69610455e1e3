// src/changes/diff.rs
//! Unified diff rendering and application.
//!
//! Rendering goes through `similar` with three lines of context. Application is
//! the inverse and is what lets a stored diff be replayed against the original.

use similar::{ChangeTag, TextDiff};

use crate::error::PatchError;

const CONTEXT_RADIUS: usize = 3;

/// Render `original -> fixed` as a unified diff with `a/` and `b/` headers.
/// Identical inputs produce an empty string.
pub fn unified_diff(original: &str, fixed: &str, path: &str) -> String {
    // Forcing newline termination makes a missing final newline show up as
    // the standard "\ No newline at end of file" marker.
    let diff = TextDiff::configure()
        .newline_terminated(true)
        .diff_lines(original, fixed);

    let mut hunks = String::new();
    for hunk in diff.unified_diff().context_radius(CONTEXT_RADIUS).iter_hunks() {
        hunks.push_str(&hunk.to_string());
    }
    if hunks.is_empty() {
        return hunks;
    }

    let mut output = String::new();
    output.push_str(&format!("--- a/{}\n", path));
    output.push_str(&format!("+++ b/{}\n", path));
    output.push_str(&hunks);
    output
}

/// Count of (added, removed) lines between two versions
pub fn diff_stats(original: &str, fixed: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(original, fixed);
    let mut added = 0;
    let mut removed = 0;

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }

    (added, removed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    old_start: usize,
    old_count: usize,
    new_count: usize,
}

impl HunkHeader {
    /// `@@ -start[,count] +start[,count] @@`; an omitted count means 1
    fn parse(line: &str) -> Result<Self, PatchError> {
        let invalid = || PatchError::InvalidHeader(line.to_string());
        let body = line.strip_prefix("@@").ok_or_else(invalid)?;
        let mut parts = body.split_whitespace();

        let old = parts.next().and_then(|p| p.strip_prefix('-')).ok_or_else(invalid)?;
        let new = parts.next().and_then(|p| p.strip_prefix('+')).ok_or_else(invalid)?;
        let (old_start, old_count) = parse_range(old).ok_or_else(invalid)?;
        let (_, new_count) = parse_range(new).ok_or_else(invalid)?;

        Ok(Self {
            old_start,
            old_count,
            new_count,
        })
    }
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Apply a unified diff produced by [`unified_diff`] to `original`.
///
/// Context and removed lines are checked against the original; any
/// disagreement is a [`PatchError::Mismatch`]. An empty diff returns the
/// original as is.
pub fn apply_unified_diff(original: &str, diff: &str) -> Result<String, PatchError> {
    let source: Vec<&str> = original.split_inclusive('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(source.len());
    let mut cursor = 0;
    // Old and new lines still owed by the current hunk
    let mut remaining = (0usize, 0usize);
    let mut last_tag = None;

    for raw in diff.split_inclusive('\n') {
        let line = raw.strip_suffix('\n').unwrap_or(raw);

        if line.starts_with('\\') {
            // Only an added line carries a newline we invented
            if last_tag == Some('+') {
                if let Some(piece) = output.last_mut() {
                    if piece.ends_with('\n') {
                        piece.pop();
                    }
                }
            }
            continue;
        }

        if remaining == (0, 0) {
            if line.starts_with("@@") {
                let header = HunkHeader::parse(line)?;
                let target = if header.old_count == 0 {
                    header.old_start
                } else {
                    header.old_start.saturating_sub(1)
                };
                if target < cursor || target > source.len() {
                    return Err(PatchError::OutOfRange {
                        line: header.old_start,
                    });
                }
                output.extend(source[cursor..target].iter().map(|s| s.to_string()));
                cursor = target;
                remaining = (header.old_count, header.new_count);
                last_tag = None;
            }
            // File headers and anything between hunks
            continue;
        }

        let (tag, content) = match line.chars().next() {
            Some(tag @ (' ' | '-' | '+')) => (tag, &line[1..]),
            // Some tools strip the space from blank context lines
            None => (' ', ""),
            Some(_) => return Err(PatchError::Mismatch { line: cursor + 1 }),
        };

        match tag {
            '+' => {
                output.push(format!("{}\n", content));
                remaining.1 = remaining.1.saturating_sub(1);
            }
            _ => {
                let piece = source
                    .get(cursor)
                    .ok_or(PatchError::OutOfRange { line: cursor + 1 })?;
                if piece.strip_suffix('\n').unwrap_or(piece) != content {
                    return Err(PatchError::Mismatch { line: cursor + 1 });
                }
                if tag == ' ' {
                    output.push(piece.to_string());
                    remaining.1 = remaining.1.saturating_sub(1);
                }
                remaining.0 = remaining.0.saturating_sub(1);
                cursor += 1;
            }
        }
        last_tag = Some(tag);
    }

    output.extend(source[cursor..].iter().map(|s| s.to_string()));
    Ok(output.concat())
}
