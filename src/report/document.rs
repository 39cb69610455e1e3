// src/report/document.rs
// Plain-text extraction from page-oriented (PDF) reports

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extract the text layer of a PDF upload. Returns `None` for anything that
/// is not a PDF or cannot be decoded; extraction problems are never fatal.
pub fn extract_pdf_text(bytes: &[u8]) -> Option<String> {
    if !looks_like_pdf(bytes) {
        return None;
    }

    // pdf-extract panics on some malformed documents instead of returning Err
    let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

    match result {
        Ok(Ok(text)) => {
            debug!("PDF extracted: {} chars", text.len());
            if text.trim().is_empty() { None } else { Some(text) }
        }
        Ok(Err(e)) => {
            debug!("Failed to extract PDF text: {}", e);
            None
        }
        Err(_) => {
            warn!("PDF decoder panicked, skipping document extraction");
            None
        }
    }
}

// The header may follow a few bytes of junk; readers accept it within the first KiB.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_bytes_are_skipped() {
        assert_eq!(extract_pdf_text(b"{\"findings\": []}"), None);
        assert_eq!(extract_pdf_text(b""), None);
    }

    #[test]
    fn truncated_pdf_is_skipped_without_panicking() {
        assert_eq!(extract_pdf_text(b"%PDF-1.7\n%garbage"), None);
    }
}
