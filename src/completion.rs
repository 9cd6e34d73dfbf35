//! Completion endpoint client.
//!
//! Performs one request/response cycle against a remote chat-completion
//! HTTP endpoint. A non-200 status is not an error at this boundary: it
//! becomes a [`CompletionOutcome::Failed`] carrying the raw response body,
//! and the turn engine decides how to fold it into the conversation. Only
//! transport faults (timeout, connection refused) surface as `Err`.
//!
//! One best-effort attempt per turn; the request timeout comes from
//! `[completion].timeout_secs`. No retries, no rate-limit handling.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CompletionConfig;
use crate::models::CompletionOutcome;

/// Environment variable holding the completion API bearer token.
pub const COMPLETION_API_KEY_ENV: &str = "LLAMA_API_KEY";

/// Fixed system instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "You are NotionAtlas, an AI assistant for Notion workspace \
    queries. Use the context if available. If context is insufficient, start with: 'Note: This \
    answer is **generated by LLAMA** & falls **outside the scope of the Notion workspace \
    data.**'";

/// Sends an assembled prompt to the completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionOutcome>;
}

/// HTTP implementation posting OpenAI-style chat messages with bearer auth.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl HttpCompletionClient {
    pub fn new(config: &CompletionConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Construct from config, reading the bearer token from the environment.
    ///
    /// # Errors
    ///
    /// A missing `LLAMA_API_KEY` is a fatal configuration error.
    pub fn from_env(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(COMPLETION_API_KEY_ENV).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", COMPLETION_API_KEY_ENV)
        })?;
        Self::new(config, api_key)
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionOutcome> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_INSTRUCTION },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Ok(CompletionOutcome::Failed {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response.json().await?;
        let answer = parse_completion_response(&json)?;
        Ok(CompletionOutcome::Answer(answer))
    }
}

/// Extract the completion text from a 200 response body and strip
/// surrounding whitespace. The text lives at the fixed path
/// `completion_message.content.text`.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    let text = json
        .get("completion_message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid completion response: missing completion_message.content.text")
        })?;

    Ok(text.trim().to_string())
}
