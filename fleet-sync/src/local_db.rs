//! Local SQLite database backing the durable store
//!
//! Provides:
//! - A single key/value table holding the serialized offline snapshot
//! - WAL mode for concurrent readers
//! - Upsert semantics so every save replaces the whole record

use crate::error::SyncResult;
use crate::store::SnapshotBackend;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

/// Configuration for local database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalDbConfig {
    /// Path to the database file
    pub db_path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to enable WAL mode
    pub enable_wal: bool,
}

impl Default for LocalDbConfig {
    fn default() -> Self {
        Self {
            db_path: "fleet_offline.db".to_string(),
            max_connections: 5,
            enable_wal: true,
        }
    }
}

/// Local database handle
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open (creating if needed) the local database
    pub async fn new(config: LocalDbConfig) -> SyncResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.db_path))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        if config.enable_wal {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
        }

        let db = Self { pool };
        db.initialize_schema().await?;

        tracing::debug!(db_path = %config.db_path, "Opened local database");

        Ok(db)
    }

    async fn initialize_schema(&self) -> SyncResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// When the record under `key` was last written, RFC 3339
    pub async fn updated_at(&self, key: &str) -> SyncResult<Option<String>> {
        let row = sqlx::query("SELECT updated_at FROM local_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("updated_at")?),
            None => None,
        })
    }

    /// Close database connection
    pub async fn close(self) -> SyncResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl SnapshotBackend for LocalDatabase {
    async fn load(&self, key: &str) -> SyncResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM local_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    async fn save(&self, key: &str, value: &str) -> SyncResult<()> {
        sqlx::query(
            r#"
            INSERT INTO local_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(key, bytes = value.len(), "Saved local state");

        Ok(())
    }
}
