//! File-persisted vector index.
//!
//! [`FileVectorIndex`] keeps the same in-memory record table as
//! [`InMemoryVectorIndex`](crate::InMemoryVectorIndex) and records every
//! mutation in one JSON-lines log per collection, `<dir>/<collection>.jsonl`.
//!
//! The first line is a header naming the collection, metric and dimension.
//! Each following line is one operation: an upsert carrying the batch's
//! records, or a delete carrying an id. Mutations append a single line, so
//! their cost depends on the batch, not on the collection size. Once the log
//! holds well over twice as many entries as live records it is compacted into
//! a header plus one upsert line, written to a temporary file and renamed into
//! place. `reset` is a compaction to an empty collection.
//!
//! The log line is written before the in-memory table changes, under the write
//! lock, so a failed write leaves memory and disk at the previous state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::document::{IndexedRecord, Metadata, NeighborResult, StoredDocument};
use crate::error::{RagError, Result};
use crate::inmemory::{RecordTable, batch_records};
use crate::vectorstore::{DistanceMetric, VectorIndex};

const BACKEND: &str = "file";

/// Log entries tolerated beyond twice the live record count before compacting.
const COMPACTION_SLACK: usize = 1024;

#[derive(Serialize, Deserialize)]
struct LogHeader {
    name: String,
    metric: DistanceMetric,
    dimension: usize,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntryRef<'a> {
    Upsert { records: &'a [IndexedRecord] },
    Delete { id: &'a str },
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Upsert { records: Vec<IndexedRecord> },
    Delete { id: String },
}

#[derive(Debug, Default)]
struct LogState {
    table: RecordTable,
    /// Records and deletes written to the log since the last compaction.
    logged: usize,
}

impl LogState {
    fn needs_compaction(&self) -> bool {
        self.logged > 2 * self.table.len() + COMPACTION_SLACK
    }
}

/// A cosine-distance vector index persisted to a directory.
///
/// # Example
///
/// ```rust,ignore
/// use ragdesk_core::FileVectorIndex;
///
/// let index = FileVectorIndex::open("./data/index", "rag_documents", 384).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorIndex {
    name: String,
    dimension: usize,
    path: PathBuf,
    state: RwLock<LogState>,
}

impl FileVectorIndex {
    /// Open (or create) the collection `name` under `dir`.
    ///
    /// The directory is created if missing. An existing log is replayed and
    /// must have been written for the same collection with the same dimension.
    /// A final line cut short by a crash is dropped and the log compacted.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] for a collection name that is not a safe file
    /// name, and [`RagError::IndexUnavailable`] when the directory or log cannot
    /// be read, or the log is corrupt or does not match.
    pub async fn open(dir: impl AsRef<Path>, name: &str, dimension: usize) -> Result<Self> {
        validate_collection_name(name)?;
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            unavailable(format!("cannot create directory '{}': {e}", dir.display()))
        })?;

        let path = dir.join(format!("{name}.jsonl"));
        let index = Self {
            name: name.to_string(),
            dimension,
            path,
            state: RwLock::new(LogState::default()),
        };

        let (state, torn_tail) = match tokio::fs::read_to_string(&index.path).await {
            Ok(text) => index.replay(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (LogState::default(), true),
            Err(e) => {
                return Err(unavailable(format!("cannot read '{}': {e}", index.path.display())));
            }
        };

        let mut guard = index.state.write().await;
        *guard = state;
        if torn_tail {
            index.compact(&mut guard).await?;
        }
        info!(
            collection = name,
            path = %index.path.display(),
            records = guard.table.len(),
            "opened vector index"
        );
        drop(guard);
        Ok(index)
    }

    /// The log file backing this index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the table from log text. The flag is set when the last line was
    /// cut short and the file should be rewritten.
    fn replay(&self, text: &str) -> Result<(LogState, bool)> {
        let corrupt = |line: usize, message: String| {
            unavailable(format!("corrupt log '{}' line {line}: {message}", self.path.display()))
        };

        let complete = text.ends_with('\n');
        let lines: Vec<&str> = text.lines().collect();
        let Some(first) = lines.first() else {
            return Err(corrupt(1, "missing header".into()));
        };

        let header: LogHeader =
            serde_json::from_str(first).map_err(|e| corrupt(1, e.to_string()))?;
        if header.name != self.name || header.metric != DistanceMetric::Cosine {
            return Err(unavailable(format!(
                "log '{}' belongs to collection '{}' ({})",
                self.path.display(),
                header.name,
                header.metric
            )));
        }
        if header.dimension != self.dimension {
            return Err(unavailable(format!(
                "log '{}' has dimension {}, expected {}",
                self.path.display(),
                header.dimension,
                self.dimension
            )));
        }

        let mut state = LogState::default();
        for (offset, line) in lines.iter().enumerate().skip(1) {
            let number = offset + 1;
            let entry: LogEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(_) if number == lines.len() && !complete => {
                    warn!(collection = %self.name, line = number, "dropping truncated log entry");
                    return Ok((state, true));
                }
                Err(e) => return Err(corrupt(number, e.to_string())),
            };
            match entry {
                LogEntry::Upsert { records } => {
                    if let Some(bad) = records.iter().find(|r| r.embedding.len() != self.dimension) {
                        return Err(corrupt(
                            number,
                            format!(
                                "record '{}' has dimension {}, expected {}",
                                bad.id,
                                bad.embedding.len(),
                                self.dimension
                            ),
                        ));
                    }
                    state.logged += records.len();
                    state.table.extend(records);
                }
                LogEntry::Delete { id } => {
                    state.logged += 1;
                    state.table.remove(&id);
                }
            }
        }
        Ok((state, !complete))
    }

    /// Append one entry. On failure the file is cut back to its previous length.
    async fn append(&self, entry: &LogEntryRef<'_>) -> Result<()> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| unavailable(format!("cannot serialize log entry: {e}")))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| unavailable(format!("cannot open '{}': {e}", self.path.display())))?;
        let len_before = file
            .metadata()
            .await
            .map_err(|e| unavailable(format!("cannot stat '{}': {e}", self.path.display())))?
            .len();

        let written: std::io::Result<()> = async {
            file.write_all(&line).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            let _ = file.set_len(len_before).await;
            return Err(unavailable(format!("cannot append to '{}': {e}", self.path.display())));
        }
        debug!(collection = %self.name, bytes = line.len(), "appended log entry");
        Ok(())
    }

    /// Rewrite the log as a header plus the live records.
    async fn compact(&self, state: &mut LogState) -> Result<()> {
        let records = state.table.records();
        let mut bytes = serde_json::to_vec(&LogHeader {
            name: self.name.clone(),
            metric: DistanceMetric::Cosine,
            dimension: self.dimension,
        })
        .map_err(|e| unavailable(format!("cannot serialize log header: {e}")))?;
        bytes.push(b'\n');
        if !records.is_empty() {
            serde_json::to_writer(&mut bytes, &LogEntryRef::Upsert { records })
                .map_err(|e| unavailable(format!("cannot serialize records: {e}")))?;
            bytes.push(b'\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| unavailable(format!("cannot write '{}': {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| unavailable(format!("cannot replace '{}': {e}", self.path.display())))?;

        state.logged = records.len();
        debug!(collection = %self.name, records = records.len(), bytes = bytes.len(), "compacted log");
        Ok(())
    }

    /// Compact when due. The log is already durable here, so a failure is only logged.
    async fn maybe_compact(&self, state: &mut LogState) {
        if state.needs_compaction() {
            if let Err(e) = self.compact(state).await {
                warn!(collection = %self.name, error = %e, "log compaction failed");
            }
        }
    }
}

fn unavailable(message: String) -> RagError {
    RagError::IndexUnavailable { backend: BACKEND.to_string(), message }
}

fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(RagError::Config(format!(
            "collection name '{name}' must be non-empty and use only ASCII letters, digits, '_', '-' or '.'"
        )))
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
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
        let records = batch_records(self.dimension, ids, contents, embeddings, metadatas)?;
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        self.append(&LogEntryRef::Upsert { records: &records }).await?;
        state.logged += records.len();
        state.table.extend(records);
        self.maybe_compact(&mut state).await;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<NeighborResult>> {
        let state = self.state.read().await;
        state.table.query(self.dimension, embedding, top_k)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredDocument>> {
        let state = self.state.read().await;
        Ok(state.table.get(id).map(StoredDocument::from))
    }

    async fn get_all(&self) -> Result<Vec<StoredDocument>> {
        let state = self.state.read().await;
        Ok(state.table.records().iter().map(StoredDocument::from).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.table.get(id).is_none() {
            return Ok(false);
        }
        self.append(&LogEntryRef::Delete { id }).await?;
        state.logged += 1;
        state.table.remove(id);
        self.maybe_compact(&mut state).await;
        Ok(true)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.read().await.table.len())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let mut empty = LogState::default();
        self.compact(&mut empty).await?;
        *state = empty;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_must_be_file_safe() {
        assert!(validate_collection_name("rag_documents").is_ok());
        assert!(validate_collection_name("docs-v2.1").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("../escape").is_err());
        assert!(validate_collection_name(".hidden").is_err());
        assert!(validate_collection_name("a/b").is_err());
    }

    #[test]
    fn compaction_waits_for_slack() {
        let mut state = LogState::default();
        state.logged = COMPACTION_SLACK;
        assert!(!state.needs_compaction());
        state.logged = COMPACTION_SLACK + 1;
        assert!(state.needs_compaction());
    }
}
