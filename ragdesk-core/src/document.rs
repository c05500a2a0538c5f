//! Data types for documents, indexed records, and retrieval results.

use serde::{Deserialize, Serialize};

/// Opaque, order-preserving document metadata.
///
/// The pipeline never interprets these values; they are stored and returned verbatim.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A caller-supplied document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique, caller-assigned identifier. Adding a document with an existing
    /// id replaces the stored one.
    pub id: String,
    /// The text content that is embedded and retrieved.
    pub content: String,
    /// Arbitrary metadata attached to the document.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: Metadata::new() }
    }

    /// Attach metadata to the document.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A document as held by a vector index, together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A stored document without its embedding, as returned by enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
}

impl From<&IndexedRecord> for StoredDocument {
    fn from(record: &IndexedRecord) -> Self {
        Self {
            id: record.id.clone(),
            content: record.content.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

/// One nearest-neighbor hit from a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeighborResult {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// Cosine distance in `[0, 2]`; 0 means identical direction.
    pub distance: f32,
}

/// A neighbor that passed the similarity threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPassage {
    pub neighbor: NeighborResult,
    /// `1 - distance`; higher is more similar.
    pub similarity: f32,
}
