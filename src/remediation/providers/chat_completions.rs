//! OpenAI-compatible chat completions (OpenAI itself and Groq)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FixProvider, FixRequest, decode_body};
use crate::error::{ProviderError, truncate_body};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";

const TEMPERATURE: f32 = 0.3;

pub struct ChatCompletionsProvider {
    name: &'static str,
    endpoint: String,
    model: String,
    client: Client,
    api_key: String,
}

impl ChatCompletionsProvider {
    pub fn groq(client: Client, api_key: String) -> Self {
        Self::new("Groq", GROQ_API_URL, GROQ_MODEL, client, api_key)
    }

    pub fn openai(client: Client, api_key: String) -> Self {
        Self::new("OpenAI", OPENAI_API_URL, OPENAI_MODEL, client, api_key)
    }

    pub fn new(
        name: &'static str,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        client: Client,
        api_key: String,
    ) -> Self {
        Self {
            name,
            endpoint: endpoint.into(),
            model: model.into(),
            client,
            api_key,
        }
    }

    fn build_request(&self, request: &FixRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.instruction(),
            }],
            temperature: TEMPERATURE,
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
    error: Option<ChatError>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatError {
    message: String,
}

fn extract_content(provider: &'static str, response: ChatResponse) -> Result<String, ProviderError> {
    if let Some(error) = response.error {
        return Err(ProviderError::Api {
            provider,
            message: error.message,
        });
    }
    response
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::EmptyResponse { provider })
}

// ============================================================================
// Provider Implementation
// ============================================================================

#[async_trait]
impl FixProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fix(&self, request: &FixRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        debug!("{} API status: {}", self.name, status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: self.name,
                status,
                body: truncate_body(&body, 300),
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = decode_body(self.name, &body)?;
        let content = extract_content(self.name, parsed)?;
        debug!("{} response length: {}", self.name, content.len());
        Ok(content)
    }
}
