// src/config/mod.rs
// Runtime configuration, loaded once at startup and handed to the pipeline

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MIN_FIX_LEN: usize = 10;
pub const DEFAULT_MAX_WALK_DEPTH: usize = 32;

/// Credentials for the remediation providers. A provider is active only when its key is set.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub groq: Option<String>,
    pub openai: Option<String>,
    pub gemini: Option<String>,
}

impl ProviderKeys {
    pub fn is_empty(&self) -> bool {
        self.groq.is_none() && self.openai.is_none() && self.gemini.is_none()
    }
}

// Keys never reach the logs, even at trace level.
impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ProviderKeys")
            .field("groq", &mark(&self.groq))
            .field("openai", &mark(&self.openai))
            .field("gemini", &mark(&self.gemini))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // ── Remediation mode
    pub offline: bool,
    pub keys: ProviderKeys,

    // ── Provider calls
    pub provider_timeout: Duration,
    pub min_fix_len: usize,

    // ── File resolution
    pub max_walk_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offline: false,
            keys: ProviderKeys::default(),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            min_fix_len: DEFAULT_MIN_FIX_LEN,
            max_walk_depth: DEFAULT_MAX_WALK_DEPTH,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            debug!(".env file not found, using environment variables and defaults");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, so callers and tests never
    /// have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let offline = match lookup("SCANFIX_OFFLINE") {
            Some(_) => var_or(&lookup, "SCANFIX_OFFLINE", false, parse_bool),
            None => var_or(&lookup, "MOCK_MODE", false, parse_bool),
        };

        let keys = ProviderKeys {
            groq: secret(&lookup, "GROQ_API_KEY"),
            openai: secret(&lookup, "OPENAI_API_KEY"),
            gemini: secret(&lookup, "GOOGLE_API_KEY").or_else(|| secret(&lookup, "GEMINI_API_KEY")),
        };

        let timeout_secs = var_or(
            &lookup,
            "SCANFIX_PROVIDER_TIMEOUT_SECS",
            DEFAULT_PROVIDER_TIMEOUT_SECS,
            |v| v.parse().ok(),
        );

        Self {
            offline,
            keys,
            provider_timeout: Duration::from_secs(timeout_secs),
            min_fix_len: var_or(&lookup, "SCANFIX_MIN_FIX_LEN", DEFAULT_MIN_FIX_LEN, |v| v.parse().ok()),
            max_walk_depth: var_or(&lookup, "SCANFIX_MAX_WALK_DEPTH", DEFAULT_MAX_WALK_DEPTH, |v| {
                v.parse().ok()
            }),
        }
    }

    /// Deterministic configuration with no providers and no network access.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

/// Reads `key`, dropping inline `# comments` and surrounding whitespace.
/// Falls back to `default` when the value is missing or does not parse.
fn var_or<F, T, P>(lookup: &F, key: &str, default: T, parse: P) -> T
where
    F: Fn(&str) -> Option<String>,
    T: fmt::Debug,
    P: Fn(&str) -> Option<T>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    let clean = raw.split('#').next().unwrap_or("").trim();
    match parse(clean) {
        Some(value) => {
            debug!("Config: {} = {:?} (from environment)", key, value);
            value
        }
        None => {
            warn!("Config: {} = '{}' (parse failed, using default {:?})", key, raw, default);
            default
        }
    }
}

// Secrets are only trimmed: a '#' can be part of a key.
fn secret<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        other => bool::from_str(other).ok(),
    }
}
