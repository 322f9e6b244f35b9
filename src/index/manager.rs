//! Per-user vector index lifecycle.
//!
//! One index exists per user id. `get_or_create` loads the persisted state
//! fully into memory; `upsert` embeds new chunks and appends them under a
//! per-user lock so concurrent ingestions for the same user cannot lose
//! each other's entries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::store::{IndexEntry, IndexStore};
use crate::core::errors::CoreError;
use crate::ingest::chunker::Chunk;
use crate::providers::EmbeddingProvider;

/// A retrieval hit: an index entry with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub entry: IndexEntry,
    pub score: f32,
}

/// A user's index, fully materialized in memory.
#[derive(Debug, Clone)]
pub struct UserIndex {
    user_id: String,
    entries: Vec<IndexEntry>,
}

impl UserIndex {
    fn new(user_id: impl Into<String>, entries: Vec<IndexEntry>) -> Self {
        UserIndex {
            user_id: user_id.into(),
            entries,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn get(&self, chunk_id: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.chunk_id == chunk_id)
    }

    /// Nearest neighbors by cosine similarity, best first.
    ///
    /// When `category` is given, only entries whose category matches
    /// exactly are considered; non-matching entries are excluded even if
    /// they are more similar than every included one.
    pub fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        category: Option<&str>,
    ) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .filter(|entry| match category {
                Some(wanted) => entry.metadata.category == wanted,
                None => true,
            })
            .map(|entry| ScoredChunk {
                entry: entry.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }
}

pub struct IndexManager {
    store: Arc<dyn IndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn IndexStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        IndexManager {
            store,
            embedder,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Load a user's index into memory, or hand back an empty one when
    /// nothing has been persisted yet.
    pub async fn get_or_create(&self, user_id: &str) -> Result<UserIndex, CoreError> {
        match self.store.load(user_id).await? {
            Some(entries) => {
                tracing::debug!("Loaded index for user {} ({} entries)", user_id, entries.len());
                Ok(UserIndex::new(user_id, entries))
            }
            None => {
                tracing::info!("No persisted index for user {}, starting empty", user_id);
                Ok(UserIndex::new(user_id, Vec::new()))
            }
        }
    }

    /// Embed `chunks` and add them to the user's index, creating it on
    /// first use. Ids must be parallel to the chunks and unique within the
    /// call. Runs under a per-user lock; the persisted id set only ever
    /// grows.
    pub async fn upsert(
        &self,
        user_id: &str,
        chunks: &[Chunk],
        ids: &[String],
    ) -> Result<UserIndex, CoreError> {
        if chunks.len() != ids.len() {
            return Err(CoreError::InvalidArgument(format!(
                "{} chunks but {} ids",
                chunks.len(),
                ids.len()
            )));
        }

        let distinct: HashSet<&String> = ids.iter().collect();
        if distinct.len() != ids.len() {
            return Err(CoreError::invalid_argument(
                "chunk ids must be unique within one upsert",
            ));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut index = self.get_or_create(user_id).await?;
        if chunks.is_empty() {
            return Ok(index);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(CoreError::Upstream(format!(
                "embedding provider returned {} vectors for {} inputs",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(ids)
            .zip(vectors)
            .map(|((chunk, id), embedding)| IndexEntry {
                chunk_id: id.clone(),
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                embedding,
            })
            .collect();

        self.store.append(user_id, &entries).await?;
        index.entries.extend(entries);

        tracing::info!(
            "Upserted {} chunks into index for user {} ({} total)",
            chunks.len(),
            user_id,
            index.len()
        );
        Ok(index)
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
