// src/resolve/mod.rs
//! Map report paths onto real files inside an untrusted repository checkout.
//!
//! Report paths come from an external tool and the repository itself is
//! untrusted, so a path is only resolved when it provably stays under the
//! repository root and does not point into vendored dependencies.

use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::DEFAULT_MAX_WALK_DEPTH;

/// Dependency-manager directories. Never remediation targets, even when present on disk.
pub const VENDOR_MARKERS: [&str; 3] = ["venv", "site-packages", "node_modules"];

/// Dependency, VCS and build-output directories. The fallback search never
/// descends into them and no file below one is ever resolved.
const PRUNED_DIRS: [&str; 10] = [
    "venv",
    ".venv",
    "node_modules",
    "site-packages",
    ".git",
    "__pycache__",
    ".hg",
    "target",
    "dist",
    "build",
];

/// A report path matched to a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Path exactly as written in the report
    pub report_path: String,
    /// Canonical absolute path, always under the repository root
    pub absolute: PathBuf,
    /// Repository-relative path with forward slashes
    pub relative: String,
}

#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
    max_depth: usize,
}

impl FileResolver {
    /// Fails only when the repository root itself cannot be canonicalized.
    pub fn new(repo_root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: repo_root.as_ref().canonicalize()?,
            max_depth: DEFAULT_MAX_WALK_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, report_path: &str) -> Option<ResolvedFile> {
        if has_vendor_segment(report_path) {
            info!("Skipping library file: {}", report_path);
            return None;
        }

        // Any `..` at all is refused, even one that would fold away
        if split_segments(report_path).any(|seg| seg == "..") {
            warn!("Invalid path detected: {}", report_path);
            return None;
        }
        let Some(segments) = normalize(report_path) else {
            warn!("Invalid path detected: {}", report_path);
            return None;
        };
        let Some(file_name) = segments.last().cloned() else {
            debug!("Report path names no file: {:?}", report_path);
            return None;
        };

        let direct = segments.iter().fold(self.root.clone(), |acc, seg| acc.join(seg));
        if let Some(found) = self.contained_file(&direct) {
            return Some(self.finish(report_path, found));
        }

        match self.search(OsStr::new(&file_name)) {
            Some(found) => {
                debug!("Resolved {} by name search: {}", report_path, found.display());
                Some(self.finish(report_path, found))
            }
            None => {
                info!("File not found in repository: {}", report_path);
                None
            }
        }
    }

    /// Canonical form of `candidate` if it is a regular file under the root.
    /// Symlinks that escape the checkout are refused here.
    fn contained_file(&self, candidate: &Path) -> Option<PathBuf> {
        let canonical = candidate.canonicalize().ok()?;
        if !canonical.starts_with(&self.root) {
            warn!("Path escapes repository root: {}", candidate.display());
            return None;
        }
        if !canonical.is_file() {
            return None;
        }
        let relative = canonical.strip_prefix(&self.root).ok()?;
        let relative = relative.to_string_lossy();
        if has_vendor_segment(&relative) || has_pruned_segment(&relative) {
            info!("Skipping non-source file: {}", relative);
            return None;
        }
        Some(canonical)
    }

    /// First file named `file_name`, walking in sorted order so the pick is stable.
    fn search(&self, file_name: &OsStr) -> Option<PathBuf> {
        WalkDir::new(&self.root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_pruned_dir(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
            .find_map(|entry| self.contained_file(entry.path()))
    }

    fn finish(&self, report_path: &str, absolute: PathBuf) -> ResolvedFile {
        let relative = absolute
            .strip_prefix(&self.root)
            .map(to_forward_slashes)
            .unwrap_or_else(|_| report_path.replace('\\', "/"));
        ResolvedFile {
            report_path: report_path.to_string(),
            absolute,
            relative,
        }
    }
}

/// Resolve `report_path` under `repo_root` with default settings.
pub fn resolve(repo_root: &Path, report_path: &str) -> Option<PathBuf> {
    FileResolver::new(repo_root)
        .ok()?
        .resolve(report_path)
        .map(|found| found.absolute)
}

fn is_pruned_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PRUNED_DIRS.contains(&name))
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty())
}

/// True if any segment is a vendor marker (a leading dot is ignored, so `.venv` counts).
pub fn has_vendor_segment(path: &str) -> bool {
    split_segments(path).any(|seg| VENDOR_MARKERS.contains(&seg.trim_start_matches('.')))
}

fn has_pruned_segment(path: &str) -> bool {
    split_segments(path).any(|seg| PRUNED_DIRS.contains(&seg))
}

/// Lexically normalize a report path into plain segments.
///
/// Leading separators are dropped so absolute paths are read relative to the
/// root. Returns `None` if a `..` survives normalization.
pub fn normalize(path: &str) -> Option<Vec<String>> {
    let mut out: Vec<&str> = Vec::new();
    for seg in split_segments(path) {
        match seg {
            "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.contains(&"..") {
        return None;
    }
    Some(out.into_iter().map(str::to_string).collect())
}

fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
