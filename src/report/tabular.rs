// src/report/tabular.rs
// CSV scan reports: a header row naming the columns, one finding per row

use csv::{ReaderBuilder, StringRecord, Trim};

use super::{DEFAULT_FILE, IssueMap};

const FILE_COLUMNS: [&str; 4] = ["file", "path", "filename", "File"];
const MESSAGE_COLUMNS: [&str; 4] = ["message", "issue", "description", "Message"];
const DEFAULT_MESSAGE: &str = "Code issue";

/// Parse a header-delimited table. The header must name at least one known
/// file or message column, otherwise any multi-line text would pass as a table.
pub fn parse_csv(text: &str) -> Option<IssueMap> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().ok()?.clone();
    let file_idx = column_indices(&headers, &FILE_COLUMNS);
    let message_idx = column_indices(&headers, &MESSAGE_COLUMNS);
    if file_idx.is_empty() && message_idx.is_empty() {
        return None;
    }

    let mut issues = IssueMap::new();
    for record in reader.records() {
        let record = record.ok()?;
        let file = first_cell(&record, &file_idx).unwrap_or(DEFAULT_FILE);
        let message = first_cell(&record, &message_idx).unwrap_or(DEFAULT_MESSAGE);
        issues.push(file, message);
    }

    issues.non_empty()
}

/// Positions of the named columns, in lookup-priority order.
fn column_indices(headers: &StringRecord, names: &[&str]) -> Vec<usize> {
    names
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == *name))
        .collect()
}

fn first_cell<'r>(record: &'r StringRecord, indices: &[usize]) -> Option<&'r str> {
    indices
        .iter()
        .filter_map(|&idx| record.get(idx))
        .find(|cell| !cell.is_empty())
}
