//! Offline feature-hashing embedding provider.
//!
//! [`HashEmbeddingProvider`] maps text to a bag-of-words vector without any
//! model download or network access. Texts that share content words point in
//! similar directions, which is enough for development setups, demos, and
//! tests. It is not a semantic model: synonyms do not match.

use async_trait::async_trait;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Default dimensionality, matching small sentence-embedding models.
pub const DEFAULT_HASH_DIMENSION: usize = 384;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Function words that carry no retrieval signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "could", "do", "does", "for",
    "from", "had", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my",
    "no", "not", "of", "on", "or", "our", "should", "so", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "to", "was", "we", "were", "what", "when", "where",
    "which", "who", "why", "will", "with", "would", "you", "your",
];

/// A deterministic embedding provider based on signed feature hashing.
///
/// Each lowercased alphanumeric token (stopwords and one-character tokens
/// removed) is hashed with FNV-1a into one of `dimension` buckets and adds
/// `+1` or `-1` depending on the hash's top bit. The result is L2-normalised.
/// Text made only of stopwords falls back to all of its tokens, so only text
/// without any alphanumeric character yields the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
    model_name: String,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of the given dimension.
    ///
    /// A dimension of zero is bumped to one so that vectors are never empty.
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self { dimension, model_name: format!("feature-hash-{dimension}") }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

/// Split text into lowercased content tokens, or every token when none is a
/// content word.
fn tokenize(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    let content: Vec<String> = words
        .iter()
        .filter(|word| word.chars().count() > 1 && !STOPWORDS.contains(&word.as_str()))
        .cloned()
        .collect();
    if content.is_empty() { words } else { content }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "hash", text_len = text.len(), "embedding single text");
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(provider = "hash", batch_size = texts.len(), "embedding batch");
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
