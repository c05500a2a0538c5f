//! # ragdesk-core
//!
//! The retrieval-and-answer pipeline behind ragdesk: embed a question, find the
//! closest stored documents by cosine distance, keep those above a similarity
//! threshold, and have a language model answer from them with traceable sources.
//!
//! ## Components
//!
//! - [`EmbeddingProvider`]: text → fixed-dimension vectors
//!   ([`HashEmbeddingProvider`], [`openai::OpenAIEmbeddingProvider`])
//! - [`VectorIndex`]: cosine nearest-neighbor storage
//!   ([`InMemoryVectorIndex`], [`FileVectorIndex`])
//! - [`filter_by_threshold`]: distance → similarity, threshold selection
//! - [`AnswerGenerator`]: grounded or context-free prompt, one [`LlmClient`] call
//! - [`RagService`]: the orchestrator exposing add / query / list / delete / reset / health
//!
//! ## Features
//!
//! - `openai` (default): OpenAI-compatible embeddings and chat-completions
//!   clients over `reqwest` (Groq is the default chat backend).

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod generator;
pub mod hashing;
pub mod inmemory;
pub mod llm;
pub mod persistent;
pub mod pipeline;
pub mod response;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod chat;
#[cfg(feature = "openai")]
pub mod openai;

pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Document, IndexedRecord, Metadata, NeighborResult, RetrievedPassage, StoredDocument,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filter::{filter_by_threshold, similarity_from_distance};
pub use generator::{AnswerGenerator, build_prompt};
pub use hashing::HashEmbeddingProvider;
pub use inmemory::InMemoryVectorIndex;
pub use llm::{GenerationParams, LlmClient};
pub use persistent::FileVectorIndex;
pub use pipeline::{QueryRequest, RagService, RagServiceBuilder};
pub use response::{
    BatchReceipt, DocumentListing, DocumentReceipt, DocumentSummary, HealthReport, QueryResponse,
    Source, content_preview, similarity_percent,
};
pub use vectorstore::{DistanceMetric, VectorIndex};
