//! Chat-completions client for OpenAI-compatible APIs (Groq by default).
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::llm::{GenerationParams, LlmClient};

/// Groq's OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The default Groq model.
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// An [`LlmClient`] that calls `{base_url}/chat/completions`.
///
/// # Example
///
/// ```rust,ignore
/// use ragdesk_core::chat::OpenAICompatibleChatClient;
///
/// let client = OpenAICompatibleChatClient::groq(std::env::var("GROQ_API_KEY")?)?;
/// let reply = client.complete("Say hi", &GenerationParams::default()).await?;
/// ```
pub struct OpenAICompatibleChatClient {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAICompatibleChatClient {
    /// Create a client for `model` at `base_url`, labelled `provider` in logs and health output.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let provider = provider.into();
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config(format!("{provider} API key must not be empty")));
        }
        Ok(Self {
            client: build_client(&provider, Duration::from_secs(60))?,
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// Create a Groq client using [`GROQ_DEFAULT_MODEL`].
    pub fn groq(api_key: impl Into<String>) -> Result<Self> {
        Self::new("groq", GROQ_API_BASE, api_key, GROQ_DEFAULT_MODEL)
    }

    /// Set the per-request timeout. A timed-out call fails with `GenerationFailed`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(&self.provider, timeout)?;
        Ok(self)
    }

    fn failed(&self, message: String) -> RagError {
        RagError::GenerationFailed { provider: self.provider.clone(), message }
    }
}

fn build_client(provider: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| RagError::GenerationFailed {
        provider: provider.to_string(),
        message: format!("failed to build HTTP client: {e}"),
    })
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl LlmClient for OpenAICompatibleChatClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        debug!(
            provider = %self.provider,
            model = %self.model,
            prompt_len = prompt.len(),
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "requesting completion"
        );

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.provider, error = %e, "completion request failed");
                self.failed(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);

            error!(provider = %self.provider, %status, "API error");
            return Err(self.failed(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "failed to parse response");
            self.failed(format!("failed to parse response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.failed("response contained no message content".into()))
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }
}
