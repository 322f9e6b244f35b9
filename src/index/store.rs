//! Durable per-user index storage.
//!
//! SQLite-backed: one row per embedded chunk, keyed by chunk id and scoped
//! to its owning user. Appends run in a single transaction so a failed
//! write never leaves a loadable half-written state.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::CoreError;
use crate::ingest::document::DocumentMetadata;

/// One embedded chunk as held by a user's index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

/// Storage backend for per-user vector indexes.
///
/// The store is append-only from this crate's point of view: entries are
/// added, never removed. `append` must be atomic — after a failure the
/// persisted state is the pre-call state.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load every entry for a user; `None` when no index was ever persisted.
    async fn load(&self, user_id: &str) -> Result<Option<Vec<IndexEntry>>, CoreError>;

    /// Append entries to a user's persisted index in one atomic step.
    async fn append(&self, user_id: &str, entries: &[IndexEntry]) -> Result<(), CoreError>;

    /// Number of persisted entries for a user.
    async fn count(&self, user_id: &str) -> Result<usize, CoreError>;
}

pub struct SqliteIndexStore {
    pool: SqlitePool,
}

impl SqliteIndexStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(CoreError::storage)?;

        let store = SqliteIndexStore { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_entries (
                chunk_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                category TEXT NOT NULL,
                tag INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_index_entries_user ON index_entries(user_id)")
            .execute(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn deserialize_embedding(chunk_id: &str, bytes: &[u8]) -> Result<Vec<f32>, CoreError> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return Err(CoreError::Storage(format!(
                "corrupt embedding blob for chunk {} ({} bytes)",
                chunk_id,
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<IndexEntry, CoreError> {
        let chunk_id: String = row.get("chunk_id");
        let embedding_bytes: Vec<u8> = row.get("embedding");
        let embedding = Self::deserialize_embedding(&chunk_id, &embedding_bytes)?;
        let tag: i64 = row.get("tag");

        Ok(IndexEntry {
            chunk_id,
            content: row.get("content"),
            metadata: DocumentMetadata {
                source: row.get("source"),
                category: row.get("category"),
                tag: tag as u64,
            },
            embedding,
        })
    }
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn load(&self, user_id: &str) -> Result<Option<Vec<IndexEntry>>, CoreError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, category, tag, embedding
             FROM index_entries
             WHERE user_id = ?1
             ORDER BY created_at, chunk_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(Self::row_to_entry(row)?);
        }
        Ok(Some(entries))
    }

    async fn append(&self, user_id: &str, entries: &[IndexEntry]) -> Result<(), CoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        for entry in entries {
            let blob = Self::serialize_embedding(&entry.embedding);
            sqlx::query(
                "INSERT INTO index_entries (chunk_id, user_id, content, source, category, tag, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&entry.chunk_id)
            .bind(user_id)
            .bind(&entry.content)
            .bind(&entry.metadata.source)
            .bind(&entry.metadata.category)
            .bind(entry.metadata.tag as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;
        }

        tx.commit().await.map_err(CoreError::storage)?;
        Ok(())
    }

    async fn count(&self, user_id: &str) -> Result<usize, CoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM index_entries WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(CoreError::storage)?;
        Ok(count as usize)
    }
}
