//! Builds the service collaborators from [`Settings`].

use std::sync::Arc;

use anyhow::Context;
use ragdesk_core::chat::OpenAICompatibleChatClient;
use ragdesk_core::openai::OpenAIEmbeddingProvider;
use ragdesk_core::{
    EmbeddingProvider, FileVectorIndex, HashEmbeddingProvider, LlmClient, RagService,
};
use tracing::{info, warn};

use crate::config::{EmbeddingBackend, Settings};

pub fn embedding_provider(settings: &Settings) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match settings.embedding_backend {
        EmbeddingBackend::Hash => {
            if let Some(model) = settings.unused_embedding_model() {
                warn!(model, "EMBEDDING_MODEL is ignored by the hash embedding backend");
            }
            Arc::new(HashEmbeddingProvider::new(settings.embedding_dimension))
        }
        EmbeddingBackend::OpenAI => {
            let mut provider = OpenAIEmbeddingProvider::new(
                settings.served_embedding_model(),
                settings.embedding_dimension,
            )?;
            if let Some(base_url) = &settings.embedding_base_url {
                provider = provider.with_base_url(base_url.as_str());
            }
            if let Some(api_key) = &settings.embedding_api_key {
                provider = provider.with_api_key(api_key.as_str());
            }
            Arc::new(provider)
        }
    };
    info!(
        model = provider.model_name(),
        dimension = provider.dimension(),
        "embedding provider ready"
    );
    Ok(provider)
}

pub fn llm_client(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    let client = OpenAICompatibleChatClient::new(
        "groq",
        settings.llm_base_url.as_str(),
        settings.groq_api_key.as_str(),
        settings.llm_model.as_str(),
    )?
    .with_timeout(settings.llm_timeout)?;
    Ok(Arc::new(client))
}

/// Construct the embedding provider, open the persisted index and connect the
/// language model, failing fast on any misconfiguration.
pub async fn build_service(settings: &Settings) -> anyhow::Result<RagService> {
    let embedding_provider = embedding_provider(settings)?;

    let index = FileVectorIndex::open(
        &settings.persist_dir,
        settings.collection_name.as_str(),
        settings.embedding_dimension,
    )
    .await
    .with_context(|| {
        format!(
            "failed to open collection '{}' in {}",
            settings.collection_name,
            settings.persist_dir.display()
        )
    })?;

    let service = RagService::builder()
        .embedding_provider(embedding_provider)
        .vector_index(Arc::new(index))
        .llm(llm_client(settings)?)
        .build()?;
    Ok(service)
}
