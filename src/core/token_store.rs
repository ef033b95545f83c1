// src/core/token_store.rs
//! SQLite-backed token storage so a CLI login survives between runs

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use super::session::TokenStore;
use crate::types::TokenPair;

pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Open (creating if needed) the session database at `database_path`.
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create session database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .with_context(|| {
                format!(
                    "Failed to open session database: {}",
                    database_path.display()
                )
            })?;

        info!("Session database opened: {}", database_path.display());

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Non-persistent store, mainly for tests.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory session database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_tokens (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to migrate session database")?;

        Ok(())
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn load(&self) -> Result<Option<TokenPair>> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT access_token, refresh_token FROM session_tokens WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read session tokens")?;

        Ok(row.map(|(access, refresh)| TokenPair { access, refresh }))
    }

    async fn save(&self, tokens: &TokenPair) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_tokens (id, access_token, refresh_token, updated_at)
            VALUES (1, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&tokens.access)
        .bind(&tokens.refresh)
        .execute(&self.pool)
        .await
        .context("Failed to store session tokens")?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM session_tokens")
            .execute(&self.pool)
            .await
            .context("Failed to clear session tokens")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_overwrites_single_row() {
        let store = SqliteTokenStore::in_memory().await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        store.save(&pair("a1", "r1")).await.unwrap();
        store.save(&pair("a2", "r2")).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(pair("a2", "r2")));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tokens_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.db");

        {
            let store = SqliteTokenStore::open(&path).await.unwrap();
            store.save(&pair("access", "refresh")).await.unwrap();
        }

        let reopened = SqliteTokenStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.load().await.unwrap(),
            Some(pair("access", "refresh"))
        );
    }
}
