// src/remediation/mod.rs
//! Remediation engine: turns (content, issues) into fixed content.
//!
//! Runs in one of two modes chosen at startup. Offline mode applies a fixed
//! substitution table. Backend mode walks the configured providers in order
//! and takes the first usable answer. Either way `remediate` never fails; when
//! nothing works the original content comes back unchanged.

pub mod offline;
pub mod providers;

pub use providers::{FixProvider, FixRequest};

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_MIN_FIX_LEN, DEFAULT_PROVIDER_TIMEOUT_SECS};
use crate::error::ProviderError;

/// First fenced block, with an optional language tag
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:\w+)?\n(.+?)```").expect("valid regex"));

/// Which path produced the fixed content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum FixSource {
    Offline,
    Provider(String),
    /// No backend produced usable output; content passed through
    Unchanged,
}

impl fmt::Display for FixSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixSource::Offline => write!(f, "offline"),
            FixSource::Provider(name) => write!(f, "{}", name),
            FixSource::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    pub fixed: String,
    pub source: FixSource,
}

enum Mode {
    Offline,
    Backend {
        providers: Vec<Box<dyn FixProvider>>,
        timeout: Duration,
        min_len: usize,
    },
}

pub struct RemediationEngine {
    mode: Mode,
}

impl RemediationEngine {
    pub fn from_config(config: &Config) -> Self {
        if config.offline {
            info!("Remediation mode: offline");
            return Self::offline();
        }
        let providers = providers::configured(&config.keys);
        if providers.is_empty() {
            warn!("No remediation provider configured, files will pass through unchanged");
        } else {
            let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
            info!("Remediation providers: {}", names.join(" → "));
        }
        Self::with_providers(providers, config.provider_timeout, config.min_fix_len)
    }

    pub fn offline() -> Self {
        Self { mode: Mode::Offline }
    }

    /// Backend mode over an explicit, ordered provider list.
    pub fn with_providers(providers: Vec<Box<dyn FixProvider>>, timeout: Duration, min_len: usize) -> Self {
        Self {
            mode: Mode::Backend {
                providers,
                timeout,
                min_len,
            },
        }
    }

    /// Backend mode with default timeout and length threshold.
    pub fn with_default_limits(providers: Vec<Box<dyn FixProvider>>) -> Self {
        Self::with_providers(
            providers,
            Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            DEFAULT_MIN_FIX_LEN,
        )
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.mode, Mode::Offline)
    }

    pub async fn remediate(&self, original: &str, issues: &[String], report_path: &str) -> Remediation {
        info!("Fixing {} ({} issue(s), {} bytes)", report_path, issues.len(), original.len());

        let (providers, timeout, min_len) = match &self.mode {
            Mode::Offline => {
                return Remediation {
                    fixed: offline::apply(original, report_path),
                    source: FixSource::Offline,
                };
            }
            Mode::Backend {
                providers,
                timeout,
                min_len,
            } => (providers, *timeout, *min_len),
        };

        let request = FixRequest::new(report_path, issues, original);
        for provider in providers {
            info!("Using {} API", provider.name());
            match call_provider(provider.as_ref(), &request, timeout, min_len).await {
                Ok(fixed) => {
                    info!("{} fixed {} ({} bytes)", provider.name(), report_path, fixed.len());
                    return Remediation {
                        fixed,
                        source: FixSource::Provider(provider.name().to_string()),
                    };
                }
                Err(e) => warn!("{} failed for {}: {}", provider.name(), report_path, e),
            }
        }

        info!("No provider produced a fix for {}, keeping original", report_path);
        Remediation {
            fixed: original.to_string(),
            source: FixSource::Unchanged,
        }
    }
}

async fn call_provider(
    provider: &dyn FixProvider,
    request: &FixRequest,
    timeout: Duration,
    min_len: usize,
) -> Result<String, ProviderError> {
    let raw = tokio::time::timeout(timeout, provider.fix(request))
        .await
        .map_err(|_| ProviderError::Timeout {
            provider: provider.name(),
            secs: timeout.as_secs(),
        })??;
    accept_fix(provider.name(), &raw, min_len)
}

/// Sanitize a provider answer and decide whether it is a usable fix.
pub fn accept_fix(provider: &'static str, raw: &str, min_len: usize) -> Result<String, ProviderError> {
    let fixed = strip_code_fence(raw);
    let len = fixed.chars().count();
    if len == 0 {
        return Err(ProviderError::EmptyResponse { provider });
    }
    if len <= min_len {
        return Err(ProviderError::Degenerate {
            provider,
            len,
            min: min_len,
        });
    }
    Ok(fixed)
}

/// Trim the answer and, if it is wrapped in markdown, keep only the first fenced block.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("```") {
        if let Some(caps) = CODE_FENCE.captures(trimmed) {
            return caps[1].trim().to_string();
        }
    }
    trimmed.to_string()
}
