//! Gemini Provider
//!
//! Uses Gemini's generateContent API. The key travels in the
//! `x-goog-api-key` header rather than the query string.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FixProvider, FixRequest, decode_body};
use crate::error::{ProviderError, truncate_body};

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

fn build_request(request: &FixRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiTextPart {
                text: request.instruction(),
            }],
        }],
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GeminiResponse) -> Result<String, ProviderError> {
    if let Some(error) = response.error {
        return Err(ProviderError::Api {
            provider: "Gemini",
            message: error.message,
        });
    }

    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse { provider: "Gemini" });
    }
    Ok(text.to_string())
}

// ============================================================================
// Provider Implementation
// ============================================================================

#[async_trait]
impl FixProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn fix(&self, request: &FixRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(GEMINI_API_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: "Gemini",
                status,
                body: truncate_body(&body, 300),
            });
        }

        let body = response.text().await?;
        let parsed: GeminiResponse = decode_body("Gemini", &body)?;
        let text = extract_text(parsed)?;
        debug!("Gemini response length: {}", text.len());
        Ok(text)
    }
}
