// src/main.rs
// scanfix - scan report driven code remediation

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scanfix::{
    config::Config,
    pipeline::{self, Orchestrator, ReviewRecord},
    report::parse_scan_report,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "scanfix")]
#[command(about = "Fix the issues a scan report names inside a repository checkout")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "SCANFIX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a scan report and print the issue map
    Parse {
        /// Scan report (PDF, JSON, XML, CSV or plain text)
        #[arg(short, long)]
        report: PathBuf,
    },

    /// Remediate a local checkout and print the change report
    Fix(FixArgs),
}

#[derive(Args)]
struct FixArgs {
    /// Repository checkout, modified in place
    #[arg(long)]
    repo: PathBuf,

    /// Scan report (PDF, JSON, XML, CSV or plain text)
    #[arg(short, long)]
    report: PathBuf,

    /// Use the built-in substitution table instead of remote providers
    #[arg(long)]
    offline: bool,

    /// Write the change report here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Include the full per-file change records
    #[arg(long)]
    raw: bool,

    /// Repository URL the report must match, when the report names one
    #[arg(long)]
    repo_url: Option<String>,

    /// Also write a review record (report, summaries, records, timestamp)
    #[arg(long)]
    record: Option<PathBuf>,
}

/// Raw bytes plus their UTF-8 reading, if there is one
fn read_report(path: &Path) -> Result<(Vec<u8>, Option<String>)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read scan report {}", path.display()))?;
    let text = String::from_utf8(bytes.clone()).ok();
    Ok((bytes, text))
}

fn emit(value: &serde_json::Value, out: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match out {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn run_parse(report: &Path) -> Result<()> {
    let (bytes, text) = read_report(report)?;
    let issues = parse_scan_report(text.as_deref(), Some(&bytes));
    info!("Parsed {} file(s), {} issue(s)", issues.len(), issues.issue_count());
    emit(&serde_json::to_value(&issues)?, None)
}

async fn run_fix(args: FixArgs) -> Result<()> {
    let mut config = Config::from_env();
    if args.offline {
        config.offline = true;
    }

    let (bytes, text) = read_report(&args.report)?;
    if let (Some(url), Some(text)) = (args.repo_url.as_deref(), text.as_deref()) {
        pipeline::verify_report_repo(text, url).context("Scan report rejected")?;
    }

    let issues = parse_scan_report(text.as_deref(), Some(&bytes));
    if issues.is_empty() {
        return emit(&json!({ "change_report": [] }), args.out.as_deref());
    }

    let orchestrator = Orchestrator::from_config(&config);
    let records = orchestrator.fix_repo_code(&args.repo, &issues).await;
    let change_report = pipeline::summarize(&records);

    if let Some(path) = &args.record {
        let repo_id = args
            .repo_url
            .clone()
            .unwrap_or_else(|| args.repo.display().to_string());
        let record = ReviewRecord::new(repo_id.clone(), repo_id, text.clone(), &records)
            .context("Failed to build review record")?;
        emit(&serde_json::to_value(&record)?, Some(path))?;
    }

    let output = if args.raw {
        json!({ "change_report": change_report, "changes": records })
    } else {
        json!({ "change_report": change_report })
    };
    emit(&output, args.out.as_deref())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level: Level = cli
        .log_level
        .parse()
        .with_context(|| format!("Invalid log level: {}", cli.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Parse { report } => run_parse(&report)?,
        Commands::Fix(args) => run_fix(args).await?,
    }

    Ok(())
}
