//! Prompt assembly and answer generation.
//!
//! [`build_prompt`] is a pure function so prompt wording can be tested without a
//! model. [`AnswerGenerator`] adds the single model call.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievedPassage;
use crate::error::{RagError, Result};
use crate::llm::{GenerationParams, LlmClient};

/// Render passages as numbered sources with their relevance.
///
/// Each entry reads `[Source N] (Relevance: P%)` followed by the passage text,
/// with `P` the similarity rounded to a whole percent.
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    let mut context = String::new();
    for (idx, passage) in passages.iter().enumerate() {
        if idx > 0 {
            context.push_str("\n\n");
        }
        let _ = write!(
            context,
            "[Source {}] (Relevance: {:.0}%)\n{}",
            idx + 1,
            passage.similarity * 100.0,
            passage.neighbor.content
        );
    }
    context
}

/// Build the prompt for `query`.
///
/// Without passages the model is asked to answer from general knowledge. With
/// passages the prompt lists them as the knowledge base, requires every
/// documented step, contact and escalation to be carried into the answer, and
/// asks for step-by-step output when the passages describe a process.
pub fn build_prompt(query: &str, passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return format!(
            "You are a helpful assistant. Answer the following question from your general knowledge.\n\
             \n\
             Question: {query}\n\
             \n\
             Give a clear and concise answer."
        );
    }

    let context = format_context(passages);
    format!(
        "You are a helpful assistant for an organisation's internal knowledge base.\n\
         \n\
         The sources below come from the verified knowledge base and describe official procedures, \
         processes and solutions.\n\
         \n\
         IMPORTANT: Base your answer on these sources and follow them. They may contain technical steps, \
         escalation procedures, contact details, meetings or email addresses; all of them are valid \
         processes and must be kept.\n\
         \n\
         Knowledge Base Context:\n\
         {context}\n\
         \n\
         User Question: {query}\n\
         \n\
         Instructions:\n\
         1. Answer from the knowledge base context above.\n\
         2. Reproduce every documented step, contact and escalation path without omission.\n\
         3. Do not dismiss, shorten or skip any documented step.\n\
         4. If the context describes a process, explain it step by step in order.\n\
         5. Present the answer clearly for the person asking.\n\
         \n\
         Answer following the documented process:"
    )
}

/// Produces answers with exactly one model call per question.
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    params: GenerationParams,
}

impl AnswerGenerator {
    /// Create a generator using `params` for every call.
    pub fn new(llm: Arc<dyn LlmClient>, params: GenerationParams) -> Self {
        Self { llm, params }
    }

    /// The underlying model client.
    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    /// The decoding parameters sent with every call.
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Answer `query`, grounded in `passages` when there are any.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationFailed`] when the model call fails or the
    /// reply is blank. The call is not retried.
    pub async fn generate(&self, query: &str, passages: &[RetrievedPassage]) -> Result<String> {
        let prompt = build_prompt(query, passages);
        debug!(
            provider = self.llm.provider_name(),
            grounded = !passages.is_empty(),
            passages = passages.len(),
            prompt_len = prompt.len(),
            "generating answer"
        );

        let answer = self.llm.complete(&prompt, &self.params).await.map_err(|e| match e {
            RagError::GenerationFailed { .. } => e,
            other => RagError::GenerationFailed {
                provider: self.llm.provider_name().to_string(),
                message: other.to_string(),
            },
        })?;

        if answer.trim().is_empty() {
            error!(provider = self.llm.provider_name(), "model returned an empty answer");
            return Err(RagError::GenerationFailed {
                provider: self.llm.provider_name().to_string(),
                message: "model returned an empty answer".into(),
            });
        }
        Ok(answer)
    }
}
