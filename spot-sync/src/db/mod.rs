//! Local client state
//!
//! The only thing persisted between runs is the serialized current user,
//! kept under [`CURRENT_USER_KEY`] in a key/value `settings` table.

use async_trait::async_trait;
use spot_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Settings key holding the serialized current user
pub const CURRENT_USER_KEY: &str = "current_user";

/// Persisted storage for the current user record
///
/// Values are opaque strings; parsing and corruption handling belong to the
/// session.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;

    async fn save(&self, value: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Open (creating if needed) the state database and its schema
pub async fn init_state_db(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new state database: {}", db_path.display());
    } else {
        info!("Opened existing state database: {}", db_path.display());
    }

    create_settings_table(&pool).await?;
    Ok(pool)
}

/// In-memory state database; lives as long as the pool
pub async fn init_in_memory() -> Result<SqlitePool> {
    // One connection, otherwise each connection sees its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_settings_table(&pool).await?;
    Ok(pool)
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// [`CredentialStore`] over the `settings` table
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(CURRENT_USER_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    async fn save(&self, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
        )
        .bind(CURRENT_USER_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(CURRENT_USER_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Process-local [`CredentialStore`]
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `value`
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    /// Current raw value
    pub fn peek(&self) -> Option<String> {
        self.value.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn set(&self, value: Option<String>) {
        if let Ok(mut guard) = self.value.lock() {
            *guard = value;
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.peek())
    }

    async fn save(&self, value: &str) -> Result<()> {
        self.set(Some(value.to_string()));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.set(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let pool = init_in_memory().await.unwrap();
        let store = SqliteCredentialStore::new(pool);

        assert_eq!(store.load().await.unwrap(), None);

        store.save(r#"{"id":"u1"}"#).await.unwrap();
        store.save(r#"{"id":"u2"}"#).await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some(r#"{"id":"u2"}"#));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_state_db_created_on_disk_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.db");

        {
            let pool = init_state_db(&path).await.unwrap();
            SqliteCredentialStore::new(pool.clone())
                .save("persisted")
                .await
                .unwrap();
            pool.close().await;
        }
        assert!(path.exists());

        let pool = init_state_db(&path).await.unwrap();
        let store = SqliteCredentialStore::new(pool);
        assert_eq!(store.load().await.unwrap().as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryCredentialStore::with_value("seed");
        assert_eq!(store.load().await.unwrap().as_deref(), Some("seed"));
        store.clear().await.unwrap();
        assert_eq!(store.peek(), None);
    }
}
