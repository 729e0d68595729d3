//! Key-Value Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed key-value store
///
/// One `entries` table; writes are upserts and `clear_all` runs inside a
/// transaction so a concurrent reader never sees a half-empty table.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Open (or create) a store at the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path_str))
            .map_err(|e| storage_error("Invalid database path", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to connect to DB", e))?;

        Self::initialize(&pool).await?;
        debug!(path = ?db_path, "Initialized key-value store");

        Ok(Self { pool })
    }

    /// Create an in-memory store
    ///
    /// Limited to a single connection: every SQLite in-memory connection
    /// is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| storage_error("Failed to connect to DB", e))?;

        Self::initialize(&pool).await?;
        Ok(Self { pool })
    }

    async fn initialize(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| storage_error("Failed to create table", e))?;
        Ok(())
    }
}

fn storage_error(context: &str, error: sqlx::Error) -> BridgeError {
    BridgeError::StorageError(format!("{}: {}", context, error))
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to store entry", e))?;

        debug!(key = key, "Stored entry");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to read entry", e))?;

        Ok(row.map(|row| row.get(0)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to delete entry", e))?;

        debug!(key = key, "Deleted entry");
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM entries ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to list keys", e))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("Failed to begin transaction", e))?;

        let removed = sqlx::query("DELETE FROM entries")
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("Failed to clear entries", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit clear", e))?;

        debug!(removed, "Cleared key-value store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();

        store.set_string("test_key", "first").await.unwrap();
        store.set_string("test_key", "second").await.unwrap();
        assert_eq!(
            store.get_string("test_key").await.unwrap(),
            Some("second".to_string())
        );

        store.delete("test_key").await.unwrap();
        assert_eq!(store.get_string("test_key").await.unwrap(), None);

        // Deleting twice is fine
        store.delete("test_key").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys_sorted() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();

        store.set_string("lyrics/b", "2").await.unwrap();
        store.set_string("lyrics/a", "1").await.unwrap();

        assert_eq!(store.list_keys().await.unwrap(), vec!["lyrics/a", "lyrics/b"]);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = SqliteKeyValueStore::in_memory().await.unwrap();

        store.set_string("k1", "v1").await.unwrap();
        store.set_string("k2", "v2").await.unwrap();
        store.clear_all().await.unwrap();

        assert!(store.list_keys().await.unwrap().is_empty());
        assert_eq!(store.get_string("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = std::env::temp_dir().join(format!(
            "lyricscope-kv-test-{}",
            std::process::id()
        ));
        let path = dir.join("nested").join("cache.db");

        {
            let store = SqliteKeyValueStore::new(path.clone()).await.unwrap();
            store.set_string("artwork/x", "[]").await.unwrap();
        }

        let reopened = SqliteKeyValueStore::new(path).await.unwrap();
        assert_eq!(
            reopened.get_string("artwork/x").await.unwrap(),
            Some("[]".to_string())
        );

        let _ = std::fs::remove_dir_all(dir);
    }
}
