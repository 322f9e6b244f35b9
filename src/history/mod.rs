//! Chat persistence: one row per question/answer turn, grouped into chats
//! per user. Writes run in single transactions; reads are plain selects.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: i64,
    pub chat_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct ChatStore {
    pool: SqlitePool,
}

impl ChatStore {
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

        let store = ChatStore { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chats (
                user_id TEXT NOT NULL,
                chat_id TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (user_id, chat_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                chat_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_turns_user_chat
             ON chat_turns(user_id, chat_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(())
    }

    /// Whether a chat row already exists for this user and chat id.
    pub async fn chat_exists(&self, user_id: &str, chat_id: &str) -> Result<bool, CoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chats WHERE user_id = ?1 AND chat_id = ?2",
        )
        .bind(user_id)
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(CoreError::storage)?;
        Ok(count > 0)
    }

    /// Store one question/answer turn.
    ///
    /// Creates the chat row on first use, taking `description` as its
    /// listing title; an existing chat's description is left untouched.
    pub async fn store_turn(
        &self,
        user_id: &str,
        chat_id: &str,
        question: &str,
        answer: &str,
        description: Option<&str>,
    ) -> Result<i64, CoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        sqlx::query(
            "INSERT OR IGNORE INTO chats (user_id, chat_id, description, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(description)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        let result = sqlx::query(
            "INSERT INTO chat_turns (user_id, chat_id, question, answer, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(question)
        .bind(answer)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        tx.commit().await.map_err(CoreError::storage)?;
        Ok(result.last_insert_rowid())
    }

    /// All chats belonging to a user, oldest first.
    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, CoreError> {
        let rows = sqlx::query(
            "SELECT chat_id, description, created_at
             FROM chats
             WHERE user_id = ?1
             ORDER BY created_at, chat_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(rows
            .iter()
            .map(|row| ChatSummary {
                chat_id: row.get("chat_id"),
                description: row.get("description"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Every turn of one chat in insertion order.
    pub async fn get_turns(
        &self,
        user_id: &str,
        chat_id: &str,
    ) -> Result<Vec<ChatTurn>, CoreError> {
        let rows = sqlx::query(
            "SELECT id, chat_id, question, answer, created_at
             FROM chat_turns
             WHERE user_id = ?1 AND chat_id = ?2
             ORDER BY id",
        )
        .bind(user_id)
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(rows
            .iter()
            .map(|row| ChatTurn {
                id: row.get("id"),
                chat_id: row.get("chat_id"),
                question: row.get("question"),
                answer: row.get("answer"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
