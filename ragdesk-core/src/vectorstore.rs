//! Vector index trait for storing and searching document embeddings.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Metadata, NeighborResult, StoredDocument};
use crate::error::Result;

/// The distance metric an index ranks neighbors by.
///
/// Only cosine distance is supported; an index never mixes metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in `[0, 2]`.
    #[default]
    Cosine,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => f.write_str("cosine"),
        }
    }
}

/// A named collection of embedded documents with nearest-neighbor search.
///
/// Implementations allow concurrent reads and serialize mutations so that a
/// reader never observes a partially applied batch. Every stored embedding has
/// [`dimension`](VectorIndex::dimension) elements.
///
/// # Example
///
/// ```rust,ignore
/// use ragdesk_core::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new("docs", 384);
/// index.upsert("d1".into(), "text".into(), embedding, Metadata::new()).await?;
/// let neighbors = index.query(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The collection name.
    fn name(&self) -> &str;

    /// The embedding dimension every record must have.
    fn dimension(&self) -> usize;

    /// The distance metric used for every query.
    fn metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }

    /// Insert a record, or replace the record with the same id.
    async fn upsert(
        &self,
        id: String,
        content: String,
        embedding: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()> {
        self.upsert_batch(vec![id], vec![content], vec![embedding], vec![metadata]).await
    }

    /// Insert or replace many records at once.
    ///
    /// The four sequences are parallel and must have equal length, otherwise
    /// [`RagError::LengthMismatch`](crate::RagError::LengthMismatch) is returned
    /// and the index is left unchanged.
    async fn upsert_batch(
        &self,
        ids: Vec<String>,
        contents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<Metadata>,
    ) -> Result<()>;

    /// Return up to `top_k` records ordered by ascending distance to `embedding`.
    ///
    /// Ties keep insertion order.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<NeighborResult>>;

    /// Fetch one record by id.
    async fn get(&self, id: &str) -> Result<Option<StoredDocument>>;

    /// Return every record in insertion order.
    async fn get_all(&self) -> Result<Vec<StoredDocument>>;

    /// Remove a record. Returns `false` when the id was not present, which is not an error.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Remove every record, keeping name, metric, and dimension.
    async fn reset(&self) -> Result<()>;
}
