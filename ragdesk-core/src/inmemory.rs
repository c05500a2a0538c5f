//! In-memory vector index using cosine distance.
//!
//! This module provides [`InMemoryVectorIndex`], a vector index backed by a
//! record table protected by a `tokio::sync::RwLock`. The same table type backs
//! the file-persisted index in [`crate::persistent`].

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexedRecord, Metadata, NeighborResult, StoredDocument};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance, clamped to `[0, 2]` to absorb rounding error.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

/// Zip parallel batch columns into records, checking lengths and dimensions first.
pub(crate) fn batch_records(
    dimension: usize,
    ids: Vec<String>,
    contents: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<Metadata>,
) -> Result<Vec<IndexedRecord>> {
    let n = ids.len();
    if contents.len() != n || embeddings.len() != n || metadatas.len() != n {
        return Err(RagError::LengthMismatch {
            ids: n,
            contents: contents.len(),
            embeddings: embeddings.len(),
            metadatas: metadatas.len(),
        });
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(RagError::DimensionMismatch { expected: dimension, actual: bad.len() });
    }

    Ok(ids
        .into_iter()
        .zip(contents)
        .zip(embeddings)
        .zip(metadatas)
        .map(|(((id, content), embedding), metadata)| IndexedRecord { id, embedding, content, metadata })
        .collect())
}

/// Records in insertion order plus an id → position lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordTable {
    records: Vec<IndexedRecord>,
    positions: HashMap<String, usize>,
}

impl RecordTable {
    #[cfg(test)]
    pub(crate) fn from_records(records: Vec<IndexedRecord>) -> Self {
        let mut table = Self::default();
        table.extend(records);
        table
    }

    /// Insert or replace each record in order; a later duplicate id wins.
    pub(crate) fn extend(&mut self, records: impl IntoIterator<Item = IndexedRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    pub(crate) fn records(&self) -> &[IndexedRecord] {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.positions.clear();
    }

    /// Replacing an existing id keeps its original position.
    fn insert(&mut self, record: IndexedRecord) {
        match self.positions.get(&record.id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        let Some(position) = self.positions.remove(id) else {
            return false;
        };
        self.records.remove(position);
        for record in &self.records[position..] {
            if let Some(slot) = self.positions.get_mut(&record.id) {
                *slot -= 1;
            }
        }
        true
    }

    pub(crate) fn get(&self, id: &str) -> Option<&IndexedRecord> {
        self.positions.get(id).map(|&position| &self.records[position])
    }

    /// Validate a batch against `dimension` and apply it.
    ///
    /// Nothing is applied unless the whole batch is valid.
    pub(crate) fn upsert_batch(
        &mut self,
        dimension: usize,
        ids: Vec<String>,
        contents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<Metadata>,
    ) -> Result<usize> {
        let records = batch_records(dimension, ids, contents, embeddings, metadatas)?;
        let n = records.len();
        self.extend(records);
        Ok(n)
    }

    pub(crate) fn query(
        &self,
        dimension: usize,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<NeighborResult>> {
        if embedding.len() != dimension {
            return Err(RagError::DimensionMismatch { expected: dimension, actual: embedding.len() });
        }

        let mut scored: Vec<(f32, &IndexedRecord)> = self
            .records
            .iter()
            .map(|record| (cosine_distance(&record.embedding, embedding), record))
            .collect();

        // Stable sort, so equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(distance, record)| NeighborResult {
                id: record.id.clone(),
                content: record.content.clone(),
                metadata: record.metadata.clone(),
                distance,
            })
            .collect())
    }
}

/// An in-memory vector index ranking by cosine distance.
///
/// All operations are async-safe via `tokio::sync::RwLock`: queries share the
/// read lock, and each mutation (a whole batch included) runs under one write lock.
///
/// # Example
///
/// ```rust,ignore
/// use ragdesk_core::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new("docs", 384);
/// assert_eq!(index.count().await?, 0);
/// ```
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    name: String,
    dimension: usize,
    table: RwLock<RecordTable>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index for embeddings of the given dimension.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self { name: name.into(), dimension, table: RwLock::new(RecordTable::default()) }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert_batch(
        &self,
        ids: Vec<String>,
        contents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<Metadata>,
    ) -> Result<()> {
        let mut table = self.table.write().await;
        table.upsert_batch(self.dimension, ids, contents, embeddings, metadatas)?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<NeighborResult>> {
        let table = self.table.read().await;
        table.query(self.dimension, embedding, top_k)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredDocument>> {
        let table = self.table.read().await;
        Ok(table.get(id).map(StoredDocument::from))
    }

    async fn get_all(&self) -> Result<Vec<StoredDocument>> {
        let table = self.table.read().await;
        Ok(table.records().iter().map(StoredDocument::from).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut table = self.table.write().await;
        Ok(table.remove(id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.len())
    }

    async fn reset(&self) -> Result<()> {
        self.table.write().await.clear();
        Ok(())
    }
}
