// src/pipeline/mod.rs
//! Orchestrator: issue map in, one change record per fixed file out.
//!
//! Entries are handled sequentially. For each one the file is resolved,
//! backed up, remediated, written back if the content changed, and diffed.
//! Any per-file failure is logged and the entry skipped; a run never fails.

pub mod files;
pub mod summary;

pub use summary::{ChangeSummary, ReviewRecord, compact_diff, summarize, verify_report_repo};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::changes::diff::{diff_stats, unified_diff};
use crate::changes::{self, Confidence, LineChange};
use crate::config::{Config, DEFAULT_MAX_WALK_DEPTH};
use crate::error::FileError;
use crate::remediation::{FixSource, RemediationEngine};
use crate::report::IssueMap;
use crate::resolve::{FileResolver, ResolvedFile};

/// Outcome for one resolved file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Path as written in the scan report
    pub file: String,
    /// Repository-relative, forward-slash path of the file actually changed
    pub full_path: String,
    pub issues_fixed: Vec<String>,
    pub fix_explanation: String,
    pub optimizations: Vec<String>,
    pub optimization_confidence: Confidence,
    pub line_changes: Vec<LineChange>,
    pub total_lines_changed: usize,
    /// Unified diff, empty when nothing changed
    pub diff: String,
    pub fixed_by: FixSource,
}

pub struct Orchestrator {
    engine: RemediationEngine,
    max_walk_depth: usize,
}

impl Orchestrator {
    pub fn new(engine: RemediationEngine) -> Self {
        Self {
            engine,
            max_walk_depth: DEFAULT_MAX_WALK_DEPTH,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(RemediationEngine::from_config(config)).with_max_walk_depth(config.max_walk_depth)
    }

    pub fn with_max_walk_depth(mut self, max_walk_depth: usize) -> Self {
        self.max_walk_depth = max_walk_depth;
        self
    }

    pub async fn fix_repo_code(&self, repo_root: &Path, issues: &IssueMap) -> Vec<ChangeRecord> {
        run(repo_root, issues, &self.engine, self.max_walk_depth).await
    }
}

/// Fix every resolvable entry of `issues` inside the checkout at `repo_root`.
pub async fn fix_repo_code(repo_root: &Path, issues: &IssueMap, engine: &RemediationEngine) -> Vec<ChangeRecord> {
    run(repo_root, issues, engine, DEFAULT_MAX_WALK_DEPTH).await
}

async fn run(repo_root: &Path, issues: &IssueMap, engine: &RemediationEngine, max_depth: usize) -> Vec<ChangeRecord> {
    let resolver = match FileResolver::new(repo_root) {
        Ok(resolver) => resolver.with_max_depth(max_depth),
        Err(e) => {
            warn!("Repository root {} is not usable: {}", repo_root.display(), e);
            return Vec::new();
        }
    };

    info!("Processing {} file(s) with {} issue(s)", issues.len(), issues.issue_count());
    let targets = group_by_file(&resolver, issues);
    let mut records = Vec::new();

    for (resolved, file_issues) in &targets {
        match fix_file(resolved, file_issues, engine).await {
            Ok(record) => {
                info!(
                    "Fixed {} ({} line(s) changed, by {})",
                    record.full_path, record.total_lines_changed, record.fixed_by
                );
                records.push(record);
            }
            Err(e) => warn!("Skipping {}: {}", resolved.report_path, e),
        }
    }

    info!("Completed: {} file(s) processed", records.len());
    records
}

/// Resolve every entry, keeping one target per file on disk.
///
/// Report paths that alias the same file (`app.py`, `./app.py`, `src/app.py`)
/// are merged into the first entry so the file is remediated and backed up once.
fn group_by_file(resolver: &FileResolver, issues: &IssueMap) -> Vec<(ResolvedFile, Vec<String>)> {
    let mut targets: Vec<(ResolvedFile, Vec<String>)> = Vec::new();
    let mut seen: HashMap<PathBuf, usize> = HashMap::new();

    for (report_path, file_issues) in issues.iter() {
        let Some(resolved) = resolver.resolve(report_path) else {
            warn!("File not found: {}", report_path);
            continue;
        };

        match seen.get(&resolved.absolute) {
            Some(&idx) => {
                let (first, merged) = &mut targets[idx];
                warn!(
                    "{} resolves to the same file as {}, merging its issues",
                    report_path, first.report_path
                );
                merged.extend(file_issues.iter().cloned());
            }
            None => {
                seen.insert(resolved.absolute.clone(), targets.len());
                targets.push((resolved, file_issues.to_vec()));
            }
        }
    }

    targets
}

async fn fix_file(
    resolved: &ResolvedFile,
    issues: &[String],
    engine: &RemediationEngine,
) -> Result<ChangeRecord, FileError> {
    let original = files::read_source(&resolved.absolute).await?;
    let backup = files::write_backup(&resolved.absolute, &original).await?;
    debug!("Backed up {} to {}", resolved.relative, backup.display());

    let remediation = engine
        .remediate(&original, issues, &resolved.report_path)
        .await;
    if remediation.fixed != original {
        files::replace_file(&resolved.absolute, &remediation.fixed).await?;
    }

    let change_set = changes::compute(&original, &remediation.fixed, issues);
    let diff = unified_diff(&original, &remediation.fixed, &resolved.relative);
    let (added, removed) = diff_stats(&original, &remediation.fixed);
    debug!("{}: +{} -{}", resolved.relative, added, removed);

    Ok(ChangeRecord {
        file: resolved.report_path.clone(),
        full_path: resolved.relative.clone(),
        issues_fixed: issues.to_vec(),
        fix_explanation: change_set.explanation,
        optimizations: change_set.optimizations,
        optimization_confidence: Confidence::Heuristic,
        total_lines_changed: change_set.line_changes.len(),
        line_changes: change_set.line_changes,
        diff,
        fixed_by: remediation.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_repo_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("not-cloned");
        let records = fix_repo_code(&gone, &IssueMap::default_review(), &RemediationEngine::offline()).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn unchanged_file_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "keep me\n").unwrap();

        let mut issues = IssueMap::new();
        issues.push("notes.txt", "typo");
        let engine = RemediationEngine::with_default_limits(Vec::new());
        let records = fix_repo_code(dir.path(), &issues, &engine).await;

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.fix_explanation, changes::NO_CHANGES_EXPLANATION);
        assert_eq!(record.total_lines_changed, 0);
        assert_eq!(record.diff, "");
        assert_eq!(record.fixed_by, FixSource::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me\n");
        assert!(files::backup_path(&path).exists());
    }

    #[test]
    fn aliased_report_paths_are_grouped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.py"), "x = 1\n").unwrap();

        let mut issues = IssueMap::new();
        issues.push("src/app.py", "first");
        issues.push("app.py", "second");
        issues.push("./src/app.py", "third");

        let resolver = FileResolver::new(dir.path()).unwrap();
        let targets = group_by_file(&resolver, &issues);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0.report_path, "src/app.py");
        assert_eq!(targets[0].1, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn orchestrator_honors_walk_depth() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("deep.py"), "x = 1\n").unwrap();

        let mut issues = IssueMap::new();
        issues.push("deep.py", "unused");

        let shallow = Orchestrator::new(RemediationEngine::offline()).with_max_walk_depth(1);
        assert!(shallow.fix_repo_code(dir.path(), &issues).await.is_empty());

        let deep = Orchestrator::new(RemediationEngine::offline());
        let records = deep.fix_repo_code(dir.path(), &issues).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].full_path, "a/b/c/deep.py");
        assert_eq!(records[0].file, "deep.py");
    }
}
