//! Process settings read from the environment.
//!
//! Variable names are matched case-insensitively: `GROQ_API_KEY`,
//! `groq_api_key` and `Groq_Api_Key` are equivalent. The exact upper-case
//! form wins when several spellings are set.
//! A `.env` file is loaded by the binary before these are read.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use ragdesk_core::chat::{GROQ_API_BASE, GROQ_DEFAULT_MODEL};
use ragdesk_core::hashing::DEFAULT_HASH_DIMENSION;

/// Dimension of `intfloat/e5-large-v2`, the default served embedding model.
pub const DEFAULT_SERVED_DIMENSION: usize = 1024;

/// Model requested from the embeddings endpoint when `EMBEDDING_MODEL` is unset.
pub const DEFAULT_EMBEDDING_MODEL: &str = "intfloat/e5-large-v2";

/// Which embedding provider the service runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// In-process feature hashing; needs no model server.
    Hash,
    /// An OpenAI-compatible `/embeddings` endpoint.
    OpenAI,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "openai" => Ok(Self::OpenAI),
            other => bail!("EMBEDDING_PROVIDER must be 'hash' or 'openai', got '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub groq_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub persist_dir: PathBuf,
    pub collection_name: String,
    pub embedding_backend: EmbeddingBackend,
    /// `EMBEDDING_MODEL` as configured; only the `openai` backend uses it.
    pub embedding_model: Option<String>,
    pub embedding_base_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_dimension: usize,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    /// Read settings from name/value pairs, matching names case-insensitively.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> anyhow::Result<Self> {
        let mut folded: HashMap<String, String> = HashMap::new();
        for (key, value) in vars {
            let upper = key.to_ascii_uppercase();
            if upper == key {
                folded.insert(upper, value);
            } else {
                folded.entry(upper).or_insert(value);
            }
        }
        Self::from_lookup(|name| folded.get(name).cloned())
    }

    /// Read settings through `lookup`, which is asked for each upper-case
    /// variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let Some(groq_api_key) = get("GROQ_API_KEY") else {
            bail!("GROQ_API_KEY must be set");
        };

        let embedding_backend = match get("EMBEDDING_PROVIDER") {
            Some(value) => value.parse()?,
            None => EmbeddingBackend::Hash,
        };
        let embedding_dimension = match get("EMBEDDING_DIMENSION") {
            Some(value) => parse_number::<usize>("EMBEDDING_DIMENSION", &value)?,
            None => match embedding_backend {
                EmbeddingBackend::Hash => DEFAULT_HASH_DIMENSION,
                EmbeddingBackend::OpenAI => DEFAULT_SERVED_DIMENSION,
            },
        };
        if embedding_dimension == 0 {
            bail!("EMBEDDING_DIMENSION must be greater than zero");
        }

        let llm_timeout = match get("LLM_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_number::<u64>("LLM_TIMEOUT_SECS", &value)?),
            None => Duration::from_secs(60),
        };
        let port = match get("PORT") {
            Some(value) => parse_number::<u16>("PORT", &value)?,
            None => 8000,
        };

        Ok(Self {
            groq_api_key,
            llm_base_url: get("LLM_BASE_URL").unwrap_or_else(|| GROQ_API_BASE.to_string()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
            llm_timeout,
            persist_dir: get("CHROMA_PERSIST_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/chroma_db")),
            collection_name: get("COLLECTION_NAME").unwrap_or_else(|| "rag_documents".to_string()),
            embedding_backend,
            embedding_model: get("EMBEDDING_MODEL"),
            embedding_base_url: get("EMBEDDING_BASE_URL"),
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_dimension,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    /// The model the `openai` backend requests.
    pub fn served_embedding_model(&self) -> &str {
        self.embedding_model.as_deref().unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    /// An explicitly configured `EMBEDDING_MODEL` that the selected backend ignores.
    pub fn unused_embedding_model(&self) -> Option<&str> {
        match self.embedding_backend {
            EmbeddingBackend::Hash => self.embedding_model.as_deref(),
            EmbeddingBackend::OpenAI => None,
        }
    }
}

fn parse_number<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().with_context(|| format!("{name} must be a number, got '{value}'"))
}
