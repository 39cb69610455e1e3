// src/remediation/providers/mod.rs
//! Remediation providers - remote LLM backends that rewrite a file
//!
//! Each provider is in its own module. All of them receive the same
//! instruction and are expected to answer with replacement content only.

mod chat_completions;
mod gemini;

pub use chat_completions::ChatCompletionsProvider;
pub use gemini::GeminiProvider;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::ProviderKeys;
use crate::error::ProviderError;

/// What a provider is asked to fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    pub report_path: String,
    /// Issue descriptions, one per line
    pub issues: String,
    pub code: String,
}

impl FixRequest {
    pub fn new(report_path: &str, issues: &[String], code: &str) -> Self {
        Self {
            report_path: report_path.to_string(),
            issues: issues.join("\n"),
            code: code.to_string(),
        }
    }

    /// The prompt sent to every provider
    pub fn instruction(&self) -> String {
        format!(
            "Fix this code issue:\n\n\
             ISSUE: {}\n\n\
             CODE:\n{}\n\n\
             Return ONLY the complete fixed code with the issue resolved. \
             Do not include explanations or markdown.",
            self.issues, self.code
        )
    }
}

/// A backend able to rewrite a file given its issues.
///
/// Implementations return the raw model output; fence stripping and
/// length checks happen in the engine so every provider is judged alike.
#[async_trait]
pub trait FixProvider: Send + Sync {
    /// Provider name for logging/identification
    fn name(&self) -> &'static str;

    async fn fix(&self, request: &FixRequest) -> Result<String, ProviderError>;
}

/// Parse a 2xx response body. A malformed body is a `Decode` error, not a network one.
fn decode_body<T: DeserializeOwned>(provider: &'static str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|source| ProviderError::Decode { provider, source })
}

/// Providers with a configured credential, fastest/cheapest first:
/// Groq, then OpenAI, then Gemini.
pub fn configured(keys: &ProviderKeys) -> Vec<Box<dyn FixProvider>> {
    let client = Client::new();
    let mut providers: Vec<Box<dyn FixProvider>> = Vec::new();

    if let Some(key) = &keys.groq {
        providers.push(Box::new(ChatCompletionsProvider::groq(client.clone(), key.clone())));
    }
    if let Some(key) = &keys.openai {
        providers.push(Box::new(ChatCompletionsProvider::openai(client.clone(), key.clone())));
    }
    if let Some(key) = &keys.gemini {
        providers.push(Box::new(GeminiProvider::new(client, key.clone())));
    }

    providers
}
