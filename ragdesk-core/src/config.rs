//! Configuration for the retrieval-and-answer pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::llm::GenerationParams;
use crate::response::PREVIEW_CHARS;

/// Configuration parameters for [`RagService`](crate::RagService).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Neighbors retrieved when a query does not say.
    pub default_top_k: usize,
    /// Largest `top_k` a query may ask for.
    pub max_top_k: usize,
    /// Minimum similarity used when a query does not say.
    pub default_similarity_threshold: f32,
    /// Characters kept in source and listing previews.
    pub preview_chars: usize,
    /// Decoding parameters for answer generation.
    pub generation: GenerationParams,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_top_k: 3,
            max_top_k: 10,
            default_similarity_threshold: 0.6,
            preview_chars: PREVIEW_CHARS,
            generation: GenerationParams::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of neighbors retrieved by default.
    pub fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Set the largest `top_k` a query may request.
    pub fn max_top_k(mut self, k: usize) -> Self {
        self.config.max_top_k = k;
        self
    }

    /// Set the similarity threshold used by default.
    pub fn default_similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.default_similarity_threshold = threshold;
        self
    }

    /// Set the preview length for sources and listings.
    pub fn preview_chars(mut self, chars: usize) -> Self {
        self.config.preview_chars = chars;
        self
    }

    /// Set the sampling temperature for answer generation.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.generation.temperature = temperature;
        self
    }

    /// Set the output token limit for answer generation.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.generation.max_tokens = max_tokens;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `max_top_k == 0` or `default_top_k` is outside `1..=max_top_k`
    /// - `default_similarity_threshold` is not within `[0, 1]`
    /// - `temperature` is negative or not finite
    /// - `max_tokens == 0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.max_top_k == 0 {
            return Err(RagError::Config("max_top_k must be greater than zero".to_string()));
        }
        if !(1..=config.max_top_k).contains(&config.default_top_k) {
            return Err(RagError::Config(format!(
                "default_top_k ({}) must be between 1 and max_top_k ({})",
                config.default_top_k, config.max_top_k
            )));
        }
        if !(0.0..=1.0).contains(&config.default_similarity_threshold) {
            return Err(RagError::Config(format!(
                "default_similarity_threshold ({}) must be between 0 and 1",
                config.default_similarity_threshold
            )));
        }
        let temperature = config.generation.temperature;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(RagError::Config(format!(
                "temperature ({temperature}) must be a non-negative number"
            )));
        }
        if config.generation.max_tokens == 0 {
            return Err(RagError::Config("max_tokens must be greater than zero".to_string()));
        }
        Ok(config)
    }
}
