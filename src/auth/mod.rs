//! User accounts: signup with an argon2 password hash, login by
//! verification. Wrong credentials are a `None` result, not an error.

use std::path::PathBuf;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
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

        let store = UserStore { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), CoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(())
    }

    /// Register a new user and return the generated user id.
    ///
    /// A reused email fails with `InvalidArgument`.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<i64, CoreError> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(CoreError::invalid_argument(
                "username, email and password are required",
            ));
        }

        let password_hash = hash_password(password)?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(err) => {
                let unique_violation = err
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if unique_violation {
                    Err(CoreError::invalid_argument("email is already registered"))
                } else {
                    Err(CoreError::storage(err))
                }
            }
        }
    }

    /// Verify credentials; `Ok(None)` means unknown email or wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<i64>, CoreError> {
        let row = sqlx::query("SELECT user_id, password_hash FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored: String = row.get("password_hash");
        let parsed = PasswordHash::new(&stored)
            .map_err(|e| CoreError::Storage(format!("stored password hash is invalid: {}", e)))?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
        {
            Ok(Some(row.get("user_id")))
        } else {
            Ok(None)
        }
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, CoreError> {
        let row = sqlx::query("SELECT user_id, username, email FROM users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        Ok(row.map(|row| UserRecord {
            user_id: row.get("user_id"),
            username: row.get("username"),
            email: row.get("email"),
        }))
    }
}

fn hash_password(password: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::InvalidArgument(format!("cannot hash password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> UserStore {
        let tmp = std::env::temp_dir().join(format!(
            "recall-users-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        UserStore::with_path(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn signup_then_login_roundtrip() {
        let store = test_store().await;

        let user_id = store
            .signup("sriram", "sriram@example.com", "hunter2!")
            .await
            .unwrap();

        let logged_in = store.login("sriram@example.com", "hunter2!").await.unwrap();
        assert_eq!(logged_in, Some(user_id));

        let user = store.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.username, "sriram");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_yield_none() {
        let store = test_store().await;
        store
            .signup("sriram", "sriram@example.com", "hunter2!")
            .await
            .unwrap();

        assert_eq!(store.login("sriram@example.com", "wrong").await.unwrap(), None);
        assert_eq!(store.login("nobody@example.com", "hunter2!").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = test_store().await;
        store
            .signup("first", "same@example.com", "pw-one")
            .await
            .unwrap();

        let result = store.signup("second", "same@example.com", "pw-two").await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let store = test_store().await;
        let result = store.signup("", "mail@example.com", "pw").await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn password_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }
}
