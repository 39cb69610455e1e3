// src/error.rs
//! Error types for the remediation pipeline.
//!
//! None of these abort a run: provider errors advance the fallback chain and
//! file errors skip a single entry. Only the binary turns failures into `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Why a remediation provider produced no usable fix
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} API error: {status} - {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{provider} rejected the request: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider} returned an unreadable body: {source}")]
    Decode {
        provider: &'static str,
        source: serde_json::Error,
    },

    #[error("{provider} timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    #[error("{provider} returned no content")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} returned {len} chars, at or below the {min} char minimum")]
    Degenerate {
        provider: &'static str,
        len: usize,
        min: usize,
    },
}

/// Per-file I/O failure; the orchestrator logs it and moves on
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A unified diff that does not apply cleanly to the given original
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Invalid hunk header: {0}")]
    InvalidHeader(String),

    #[error("Line {line} of the original does not match the patch")]
    Mismatch { line: usize },

    #[error("Patch runs past the end of the original at line {line}")]
    OutOfRange { line: usize },
}

/// The scan report names a different repository than the one being fixed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Repository URL and scan report do not match (input: {input}, report: {report})")]
pub struct RepoMismatch {
    pub input: String,
    pub report: String,
}

/// Truncate a response body for error messages, on a char boundary.
pub(crate) fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
