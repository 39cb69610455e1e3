// src/lib.rs
//! scanfix: parse a static-analysis scan report, remediate the files it names
//! inside a repository checkout, and describe every change made.

pub mod changes;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod remediation;
pub mod report;
pub mod resolve;

pub use changes::{ChangeKind, LineChange};
pub use config::Config;
pub use pipeline::{ChangeRecord, Orchestrator, fix_repo_code};
pub use remediation::RemediationEngine;
pub use report::{IssueMap, parse_scan_report};
