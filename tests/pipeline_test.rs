// tests/pipeline_test.rs
// End-to-end remediation runs against throwaway repositories
//
// Tests:
// 1. Offline remediation rewrites files and reports positional line changes
// 2. Failing providers leave files untouched without aborting the run
// 3. Traversal and vendored paths are skipped
// 4. Backups and unified diffs reproduce both sides of every change
// 5. Summaries and review records serialize the run

use async_trait::async_trait;
use scanfix::changes::ChangeKind;
use scanfix::changes::diff::apply_unified_diff;
use scanfix::error::ProviderError;
use scanfix::pipeline::{self, ReviewRecord, files::backup_path};
use scanfix::remediation::offline::PY_MARKER;
use scanfix::remediation::{FixProvider, FixRequest, FixSource};
use scanfix::{IssueMap, RemediationEngine, fix_repo_code, parse_scan_report};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// TEST SETUP
// ============================================================================

fn setup_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).expect("Failed to create dirs");
        fs::write(&full, content).expect("Failed to write file");
    }
    dir
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).expect("Failed to read file")
}

struct FailingProvider(&'static str);

#[async_trait]
impl FixProvider for FailingProvider {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn fix(&self, _request: &FixRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Api {
            provider: self.0,
            message: "quota exceeded".into(),
        })
    }
}

struct UppercaseProvider;

#[async_trait]
impl FixProvider for UppercaseProvider {
    fn name(&self) -> &'static str {
        "Upper"
    }

    async fn fix(&self, request: &FixRequest) -> Result<String, ProviderError> {
        Ok(format!("```\n{}\n```", request.code.to_uppercase()))
    }
}

// ============================================================================
// OFFLINE MODE
// ============================================================================

#[tokio::test]
async fn offline_python_fix_modifies_first_line() {
    let repo = setup_repo(&[("hello.py", "print \"hi\"\n")]);
    let issues = parse_scan_report(Some("hello.py: print statement is Python 2"), None);

    let records = fix_repo_code(repo.path(), &issues, &RemediationEngine::offline()).await;
    assert_eq!(records.len(), 1);
    let record = &records[0];

    let fixed = read(repo.path(), "hello.py");
    assert!(fixed.contains("print(\"hi\")"));
    assert!(fixed.contains(PY_MARKER));

    let modified: Vec<_> = record
        .line_changes
        .iter()
        .filter(|c| c.change_type == ChangeKind::Modified)
        .collect();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].line_number, 1);
    assert_eq!(modified[0].original, "print \"hi\"");
    assert_eq!(modified[0].fixed, "print(\"hi\")");

    assert_eq!(record.file, "hello.py");
    assert_eq!(record.full_path, "hello.py");
    assert_eq!(record.issues_fixed, vec!["print statement is Python 2"]);
    assert_eq!(record.total_lines_changed, record.line_changes.len());
    assert_eq!(record.fixed_by, FixSource::Offline);
    assert_eq!(
        record.fix_explanation,
        "Fixed 1 issue(s) with 1 line modifications using automated remediation"
    );
}

#[tokio::test]
async fn backup_and_diff_reproduce_both_sides() {
    let original = "def calculate(a, b):\n    return a / b\n\nprint \"done\"\n";
    let repo = setup_repo(&[("src/calc.py", original)]);
    let mut issues = IssueMap::new();
    issues.push("src/calc.py", "division by zero");

    let records = fix_repo_code(repo.path(), &issues, &RemediationEngine::offline()).await;
    assert_eq!(records.len(), 1);
    let record = &records[0];

    let fixed = read(repo.path(), "src/calc.py");
    assert_ne!(fixed, original);
    assert_eq!(fs::read_to_string(backup_path(&repo.path().join("src/calc.py"))).unwrap(), original);

    assert!(record.diff.starts_with("--- a/src/calc.py\n+++ b/src/calc.py\n"));
    assert_eq!(apply_unified_diff(original, &record.diff).unwrap(), fixed);
}

// ============================================================================
// PROVIDER FALLBACK
// ============================================================================

#[tokio::test]
async fn all_providers_failing_leaves_files_untouched() {
    let original = "const x = 1\n";
    let repo = setup_repo(&[("web/app.js", original)]);
    let mut issues = IssueMap::new();
    issues.push("web/app.js", "missing semicolon");

    let engine = RemediationEngine::with_default_limits(vec![
        Box::new(FailingProvider("Groq")),
        Box::new(FailingProvider("OpenAI")),
        Box::new(FailingProvider("Gemini")),
    ]);
    let records = fix_repo_code(repo.path(), &issues, &engine).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fixed_by, FixSource::Unchanged);
    assert!(records[0].line_changes.is_empty());
    assert_eq!(records[0].fix_explanation, "No changes needed");
    assert_eq!(read(repo.path(), "web/app.js"), original);
}

#[tokio::test]
async fn fallback_provider_answer_is_written() {
    let repo = setup_repo(&[("notes.md", "fix the typo in this sentence\n")]);
    let mut issues = IssueMap::new();
    issues.push("notes.md", "shouting required");

    let engine = RemediationEngine::with_default_limits(vec![
        Box::new(FailingProvider("Groq")),
        Box::new(UppercaseProvider),
    ]);
    let records = fix_repo_code(repo.path(), &issues, &engine).await;

    assert_eq!(records[0].fixed_by, FixSource::Provider("Upper".into()));
    // Fences stripped and answer trimmed before writing
    assert_eq!(read(repo.path(), "notes.md"), "FIX THE TYPO IN THIS SENTENCE");
}

// ============================================================================
// PATH SAFETY
// ============================================================================

#[tokio::test]
async fn traversal_and_vendored_entries_are_skipped() {
    let outer = setup_repo(&[
        ("secret.py", "TOKEN = 'x'\n"),
        ("repo/app.py", "print \"ok\"\n"),
        ("repo/node_modules/lib/index.js", "module.exports = 1\n"),
        ("repo/.venv/lib/site.py", "x = 1\n"),
    ]);
    let root = outer.path().join("repo");

    let mut issues = IssueMap::new();
    issues.push("../secret.py", "leaks a token");
    issues.push("node_modules/lib/index.js", "old syntax");
    issues.push(".venv/lib/site.py", "unused");
    issues.push("does/not/exist.py", "ghost");
    issues.push("app.py", "print statement");

    let records = fix_repo_code(&root, &issues, &RemediationEngine::offline()).await;

    let files: Vec<_> = records.iter().map(|r| r.full_path.as_str()).collect();
    assert_eq!(files, vec!["app.py"]);
    assert_eq!(read(outer.path(), "secret.py"), "TOKEN = 'x'\n");
    assert_eq!(read(&root, "node_modules/lib/index.js"), "module.exports = 1\n");
    assert!(!backup_path(&root.join("node_modules/lib/index.js")).exists());
}

#[tokio::test]
async fn vcs_internals_are_never_rewritten() {
    let hook = "#!/bin/sh\nexit 0\n";
    let repo = setup_repo(&[(".git/hooks/pre-commit", hook), (".git/config", "[core]\n")]);
    let mut issues = IssueMap::new();
    issues.push(".git/hooks/pre-commit", "bad hook");
    issues.push(".git/config", "insecure setting");

    let records = fix_repo_code(repo.path(), &issues, &RemediationEngine::offline()).await;

    assert!(records.is_empty());
    assert_eq!(read(repo.path(), ".git/hooks/pre-commit"), hook);
    assert_eq!(read(repo.path(), ".git/config"), "[core]\n");
    assert!(!backup_path(&repo.path().join(".git/hooks/pre-commit")).exists());
}

#[tokio::test]
async fn aliased_paths_fix_the_file_once() {
    let original = "print \"hi\"\n";
    let repo = setup_repo(&[("src/app.py", original)]);
    let mut issues = IssueMap::new();
    issues.push("src/app.py", "py2 print");
    issues.push("app.py", "missing newline");
    issues.push("./src/app.py", "style");

    let records = fix_repo_code(repo.path(), &issues, &RemediationEngine::offline()).await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.file, "src/app.py");
    assert_eq!(record.issues_fixed, vec!["py2 print", "missing newline", "style"]);

    // Backup still holds the pre-run content and the diff is against it
    let backup = backup_path(&repo.path().join("src/app.py"));
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
    let fixed = read(repo.path(), "src/app.py");
    assert_eq!(apply_unified_diff(original, &record.diff).unwrap(), fixed);
    assert_eq!(fixed.matches(PY_MARKER).count(), 1);
}

// ============================================================================
// REPORTING
// ============================================================================

#[tokio::test]
async fn summaries_and_review_record() {
    let repo = setup_repo(&[("pkg/mod.py", "print \"a\"\n"), ("pkg/same.txt", "z\n")]);
    let report = r#"{"findings":[{"file":"pkg/mod.py","message":"py2 print","line":1}]}"#;
    let issues = parse_scan_report(Some(report), Some(report.as_bytes()));

    let records = fix_repo_code(repo.path(), &issues, &RemediationEngine::offline()).await;
    let summaries = pipeline::summarize(&records);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].file, "pkg/mod.py");
    assert_eq!(summaries[0].issues_fixed, vec!["Line 1: py2 print"]);
    assert!(summaries[0].diff.starts_with("Line 1: - print \"a\"\nLine 1: + print(\"a\")"));

    let record = ReviewRecord::new("https://x/repo", "https://x/repo-fixed", Some(report.into()), &records).unwrap();
    let stored: Vec<pipeline::ChangeRecord> = serde_json::from_str(&record.diff_content).unwrap();
    assert_eq!(stored, records);
    let summary_json: serde_json::Value = serde_json::from_str(&record.changes_summary).unwrap();
    assert_eq!(summary_json[0]["file"], "pkg/mod.py");
    assert_eq!(record.scan_report.as_deref(), Some(report));
}
