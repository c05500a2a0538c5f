//! Language model collaborator used by the answer generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Decoding parameters for a single completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature. Kept low so answers stay close to the passages.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: 0.3, max_tokens: 1000 }
    }
}

/// A prompt-completion backend.
///
/// One call to [`complete`](LlmClient::complete) is one round trip to the model.
/// Implementations report failures as
/// [`RagError::GenerationFailed`](crate::RagError::GenerationFailed) and do not retry.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` as a single user message and return the model's reply.
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Short provider label, e.g. `groq`.
    fn provider_name(&self) -> &str;

    /// The model identifier requests are sent to.
    fn model(&self) -> &str;
}
