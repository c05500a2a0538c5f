//! Retrieval-and-answer orchestrator.
//!
//! [`RagService`] wires an [`EmbeddingProvider`], a [`VectorIndex`] and an
//! [`AnswerGenerator`] into the document operations and the query pipeline:
//! validate → embed → nearest neighbors → threshold filter → generate → package.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragdesk_core::{Document, QueryRequest, RagService, InMemoryVectorIndex, HashEmbeddingProvider};
//!
//! let service = RagService::builder()
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::new(384)))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new("docs", 384)))
//!     .llm(Arc::new(my_llm))
//!     .build()?;
//!
//! service.add(Document::new("d1", "To reset your password, email support@x.com")).await?;
//! let response = service.query(&QueryRequest::new("how do I reset my password")).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::RagConfig;
use crate::document::{Document, StoredDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::filter::filter_by_threshold;
use crate::generator::AnswerGenerator;
use crate::llm::LlmClient;
use crate::response::{
    BatchReceipt, DocumentListing, DocumentReceipt, DocumentSummary, HealthReport, QueryResponse,
    Source,
};
use crate::vectorstore::VectorIndex;

/// A question plus optional retrieval overrides.
///
/// Unset fields fall back to the service's [`RagConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), top_k: None, similarity_threshold: None }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Resolve defaults and check ranges: `top_k` in `1..=max_top_k`, threshold in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] naming the offending parameter.
    pub fn validate(&self, config: &RagConfig) -> Result<(usize, f32)> {
        let top_k = self.top_k.unwrap_or(config.default_top_k);
        if !(1..=config.max_top_k).contains(&top_k) {
            return Err(RagError::InvalidInput(format!(
                "top_k must be between 1 and {}, got {top_k}",
                config.max_top_k
            )));
        }
        let threshold = self.similarity_threshold.unwrap_or(config.default_similarity_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RagError::InvalidInput(format!(
                "similarity_threshold must be between 0 and 1, got {threshold}"
            )));
        }
        Ok((top_k, threshold))
    }
}

/// Wrap a component error as the orchestrator's single failure outcome.
fn pipeline_failure(operation: &'static str) -> impl FnOnce(RagError) -> RagError {
    move |source| {
        error!(operation, error = %source, "pipeline operation failed");
        RagError::PipelineFailed { operation, source: Box::new(source) }
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(RagError::InvalidInput("document id must not be empty".to_string()));
    }
    Ok(())
}

/// The retrieval-and-answer service.
///
/// Holds shared handles to its collaborators; clone the surrounding `Arc` to
/// use it from many tasks. Construct one via [`RagService::builder()`].
pub struct RagService {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    generator: AnswerGenerator,
}

impl RagService {
    /// Create a new [`RagServiceBuilder`].
    pub fn builder() -> RagServiceBuilder {
        RagServiceBuilder::default()
    }

    /// Return a reference to the service configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector index.
    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Embed and store one document, replacing any document with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] for an empty id and
    /// [`RagError::PipelineFailed`] if embedding or storage fails.
    pub async fn add(&self, document: Document) -> Result<DocumentReceipt> {
        validate_id(&document.id)?;
        let embedding = self
            .embedding_provider
            .embed(&document.content)
            .await
            .map_err(pipeline_failure("add"))?;

        let Document { id, content, metadata } = document;
        self.index
            .upsert(id.clone(), content, embedding, metadata)
            .await
            .map_err(pipeline_failure("add"))?;

        let total_documents = self.index.count().await.map_err(pipeline_failure("add"))?;
        info!(document.id = %id, total_documents, "added document");
        Ok(DocumentReceipt { id, total_documents })
    }

    /// Embed and store many documents with one batch embedding call and one index write.
    ///
    /// Reports a single failure for the whole batch.
    pub async fn add_batch(&self, documents: Vec<Document>) -> Result<BatchReceipt> {
        if documents.is_empty() {
            let total_documents = self.index.count().await.map_err(pipeline_failure("add_batch"))?;
            return Ok(BatchReceipt { added: 0, total_documents });
        }
        for document in &documents {
            validate_id(&document.id)?;
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let embeddings = self
            .embedding_provider
            .embed_batch(&texts)
            .await
            .map_err(pipeline_failure("add_batch"))?;

        let added = documents.len();
        let mut ids = Vec::with_capacity(added);
        let mut contents = Vec::with_capacity(added);
        let mut metadatas = Vec::with_capacity(added);
        for Document { id, content, metadata } in documents {
            ids.push(id);
            contents.push(content);
            metadatas.push(metadata);
        }

        self.index
            .upsert_batch(ids, contents, embeddings, metadatas)
            .await
            .map_err(pipeline_failure("add_batch"))?;

        let total_documents = self.index.count().await.map_err(pipeline_failure("add_batch"))?;
        info!(added, total_documents, "added document batch");
        Ok(BatchReceipt { added, total_documents })
    }

    /// Answer a question from the stored documents.
    ///
    /// When no neighbor reaches the threshold (or the index is empty) the answer
    /// is generated without context and `num_sources` is 0.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] before any work if `top_k` or the
    /// threshold is out of range, and [`RagError::PipelineFailed`] if any stage fails.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let (top_k, threshold) = request.validate(&self.config)?;
        let preview: String = request.query.chars().take(50).collect();
        info!(query = %preview, top_k, threshold, "running query");

        let query_embedding = self
            .embedding_provider
            .embed(&request.query)
            .await
            .map_err(pipeline_failure("query"))?;

        let neighbors =
            self.index.query(&query_embedding, top_k).await.map_err(pipeline_failure("query"))?;
        let retrieved = neighbors.len();

        let passages = filter_by_threshold(neighbors, threshold);
        info!(retrieved, relevant = passages.len(), "filtered neighbors");

        let answer = self
            .generator
            .generate(&request.query, &passages)
            .await
            .map_err(pipeline_failure("query"))?;

        let sources: Vec<Source> = passages
            .iter()
            .map(|passage| Source::from_passage(passage, self.config.preview_chars))
            .collect();

        info!(num_sources = sources.len(), "answer generated");
        Ok(QueryResponse { answer, num_sources: sources.len(), sources })
    }

    /// List every stored document with previewed content.
    pub async fn list_all(&self) -> Result<DocumentListing> {
        let documents = self.index.get_all().await.map_err(pipeline_failure("list_all"))?;
        let documents: Vec<DocumentSummary> = documents
            .into_iter()
            .map(|d| DocumentSummary::from_stored(d, self.config.preview_chars))
            .collect();
        info!(total = documents.len(), "listed documents");
        Ok(DocumentListing { total: documents.len(), documents })
    }

    /// Fetch one stored document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if no document has this id.
    pub async fn get(&self, id: &str) -> Result<StoredDocument> {
        self.index
            .get(id)
            .await
            .map_err(pipeline_failure("get"))?
            .ok_or_else(|| RagError::NotFound(id.to_string()))
    }

    /// Delete a document. Deleting an unknown id only logs a warning.
    pub async fn delete(&self, id: &str) -> Result<DocumentReceipt> {
        let removed = self.index.delete(id).await.map_err(pipeline_failure("delete"))?;
        let total_documents = self.index.count().await.map_err(pipeline_failure("delete"))?;
        if removed {
            info!(document.id = %id, total_documents, "deleted document");
        } else {
            warn!(document.id = %id, "delete requested for unknown document");
        }
        Ok(DocumentReceipt { id: id.to_string(), total_documents })
    }

    /// Remove every document from the index.
    pub async fn reset(&self) -> Result<()> {
        self.index.reset().await.map_err(pipeline_failure("reset"))?;
        info!(collection = self.index.name(), "index reset");
        Ok(())
    }

    /// Report service status and document count.
    pub async fn health(&self) -> Result<HealthReport> {
        let doc_count = self.index.count().await.map_err(pipeline_failure("health"))?;
        let llm = self.generator.llm();
        Ok(HealthReport {
            status: "healthy".to_string(),
            model_name: self.embedding_provider.model_name().to_string(),
            doc_count,
            llm_provider: format!("{} ({})", llm.provider_name(), llm.model()),
        })
    }
}

/// Builder for constructing a [`RagService`].
///
/// The embedding provider, vector index and LLM client are required; the
/// configuration defaults to [`RagConfig::default()`].
#[derive(Default)]
pub struct RagServiceBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    llm: Option<Arc<dyn LlmClient>>,
}

impl RagServiceBuilder {
    /// Set the service configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the language model client used for answers.
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build the [`RagService`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required part is missing or the index
    /// dimension differs from the embedding provider's.
    pub fn build(self) -> Result<RagService> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::Config("vector_index is required".to_string()))?;
        let llm = self.llm.ok_or_else(|| RagError::Config("llm is required".to_string()))?;

        if index.dimension() != embedding_provider.dimension() {
            return Err(RagError::Config(format!(
                "vector index '{}' expects dimension {} but embedding model '{}' produces {}",
                index.name(),
                index.dimension(),
                embedding_provider.model_name(),
                embedding_provider.dimension()
            )));
        }

        let generator = AnswerGenerator::new(llm, config.generation);
        Ok(RagService { config, embedding_provider, index, generator })
    }
}
