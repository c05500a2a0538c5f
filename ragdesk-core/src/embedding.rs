//! Text → vector conversion used for both stored documents and questions.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// [`embed_batch`](EmbeddingProvider::embed_batch) falls back to one
/// [`embed`](EmbeddingProvider::embed) call per text; remote backends send the
/// whole batch in one request instead.
///
/// Every vector a provider returns has exactly [`dimension`](EmbeddingProvider::dimension)
/// elements, and that value never changes for the lifetime of the instance.
///
/// # Example
///
/// ```rust,ignore
/// use ragdesk_core::{EmbeddingProvider, HashEmbeddingProvider};
///
/// let provider = HashEmbeddingProvider::new(384);
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimension());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Length of every returned vector.
    fn dimension(&self) -> usize;

    /// Model identifier reported by health checks.
    fn model_name(&self) -> &str;
}
