//! Caller-facing result shapes and their formatting helpers.

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, RetrievedPassage, StoredDocument};

/// Maximum number of characters kept in a content preview.
pub const PREVIEW_CHARS: usize = 200;

/// Cut `content` to at most `max_chars` characters, appending `...` when anything was cut.
///
/// Counts Unicode scalar values, so multi-byte text is never split mid-character.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => format!("{}...", &content[..byte_offset]),
        None => content.to_string(),
    }
}

/// Format a similarity score as a percentage with one decimal place, e.g. `87.5%`.
pub fn similarity_percent(similarity: f32) -> String {
    format!("{:.1}%", similarity * 100.0)
}

/// One retrieved passage as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub content_preview: String,
    pub similarity_percent: String,
    pub metadata: Metadata,
}

impl Source {
    /// Build a source entry from a passage, previewing at most `preview_chars` characters.
    pub fn from_passage(passage: &RetrievedPassage, preview_chars: usize) -> Self {
        Self {
            id: passage.neighbor.id.clone(),
            content_preview: content_preview(&passage.neighbor.content, preview_chars),
            similarity_percent: similarity_percent(passage.similarity),
            metadata: passage.neighbor.metadata.clone(),
        }
    }
}

/// The answer to a query together with the passages that grounded it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub num_sources: usize,
}

/// A stored document with its content shortened for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub content_preview: String,
    pub metadata: Metadata,
}

impl DocumentSummary {
    pub fn from_stored(document: StoredDocument, preview_chars: usize) -> Self {
        Self {
            content_preview: content_preview(&document.content, preview_chars),
            id: document.id,
            metadata: document.metadata,
        }
    }
}

/// Every document in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentListing {
    pub total: usize,
    pub documents: Vec<DocumentSummary>,
}

/// Result of adding or deleting a single document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentReceipt {
    pub id: String,
    pub total_documents: usize,
}

/// Result of adding a batch of documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReceipt {
    pub added: usize,
    pub total_documents: usize,
}

/// Service status for health checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub model_name: String,
    pub doc_count: usize,
    pub llm_provider: String,
}
