use std::time::Duration;

use axum::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service is not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("empty completion")]
    EmptyResponse,
}

/// A text model that turns one prompt into one completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// OpenAI-compatible chat completions client. One attempt per call.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Newer models take the output budget as `max_completion_tokens`.
    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
        });
        let budget_key = if self.config.model.starts_with("gpt-5") {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        body[budget_key] = json!(self.config.max_tokens);
        body
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GenerationError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        debug!(model = %self.config.model, chars = content.len(), "completion received");
        Ok(content)
    }
}
