//! Session Store
//!
//! One row per logical session id in `sessions(id, data jsonb, updated_at)`.
//! Every write replaces the full file mapping; a concurrent load never sees a
//! partially written snapshot because the upsert is a single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Mapping from auth filename to base64-encoded content.
pub type SessionFiles = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed snapshot payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A stored point-in-time copy of the auth directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub files: SessionFiles,
    pub updated_at: DateTime<Utc>,
}

/// Durable key-value persistence for one named session's credential bundle.
///
/// All operations are fallible, potentially slow I/O; callers log and degrade
/// on failure rather than crash the daemon.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Idempotently create the backing table. Safe to call on every startup.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Fetch the current snapshot. `Ok(None)` when no row exists yet, which
    /// is the expected state on first-ever boot.
    async fn load(&self, id: &str) -> Result<Option<SessionSnapshot>, StoreError>;

    /// Upsert the full snapshot, overwriting prior files and timestamp.
    async fn save(&self, id: &str, files: &SessionFiles) -> Result<(), StoreError>;

    /// Delete the row. Clearing an already-absent id is not an error.
    async fn clear(&self, id: &str) -> Result<(), StoreError>;
}

// ─── Postgres ──────────────────────────────────────────────────────────────

const TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS sessions (
    id          text PRIMARY KEY,
    data        jsonb,
    updated_at  timestamptz DEFAULT now()
)";

/// Postgres-backed session store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with a small pool; auth snapshots are rare, low-volume writes.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        let row = sqlx::query("SELECT data, updated_at FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let data: Option<serde_json::Value> = row.try_get("data")?;
                let Some(data) = data else {
                    return Ok(None);
                };
                let files: SessionFiles = serde_json::from_value(data)?;
                let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
                Ok(Some(SessionSnapshot { files, updated_at }))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, files: &SessionFiles) -> Result<(), StoreError> {
        let payload = serde_json::to_value(files)?;
        sqlx::query(
            "INSERT INTO sessions (id, data, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at",
        )
        .bind(id)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ─── In-memory ─────────────────────────────────────────────────────────────

/// In-process session store. Used when no database is configured (sessions do
/// not survive a restart) and by tests.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, SessionSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self.rows.lock().await.get(id).cloned())
    }

    async fn save(&self, id: &str, files: &SessionFiles) -> Result<(), StoreError> {
        self.rows.lock().await.insert(
            id.to_string(),
            SessionSnapshot {
                files: files.clone(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<(), StoreError> {
        self.rows.lock().await.remove(id);
        Ok(())
    }
}

/// Store whose writes always fail. Test double for degraded-store scenarios.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait]
impl SessionStore for FailingStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn load(&self, _id: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn save(&self, _id: &str, _files: &SessionFiles) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn clear(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn files(pairs: &[(&str, &str)]) -> SessionFiles {
        pairs
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_load_never_written_id_is_absent_not_error() {
        let store = MemoryStore::new();
        let loaded = store.load("whatsapp").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = MemoryStore::new();
        let mapping = files(&[("creds.json", "eyJ9"), ("keys.json", "e30=")]);
        store.save("whatsapp", &mapping).await.unwrap();

        let snapshot = store.load("whatsapp").await.unwrap().unwrap();
        assert_eq!(snapshot.files, mapping);
    }

    #[tokio::test]
    async fn test_save_is_idempotent_for_identical_input() {
        let store = MemoryStore::new();
        let mapping = files(&[("creds.json", "eyJ9")]);
        store.save("whatsapp", &mapping).await.unwrap();
        store.save("whatsapp", &mapping).await.unwrap();

        let snapshot = store.load("whatsapp").await.unwrap().unwrap();
        assert_eq!(snapshot.files, mapping);
    }

    #[tokio::test]
    async fn test_save_fully_replaces_previous_mapping() {
        let store = MemoryStore::new();
        store
            .save("whatsapp", &files(&[("old.json", "b2xk"), ("keep.json", "a2VlcA==")]))
            .await
            .unwrap();
        let second = files(&[("keep.json", "bmV3")]);
        store.save("whatsapp", &second).await.unwrap();

        let snapshot = store.load("whatsapp").await.unwrap().unwrap();
        assert_eq!(snapshot.files, second, "no merge with earlier snapshot");
    }

    #[tokio::test]
    async fn test_clear_missing_id_succeeds() {
        let store = MemoryStore::new();
        store.clear("whatsapp").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_removes_row() {
        let store = MemoryStore::new();
        store.save("whatsapp", &files(&[("creds.json", "eyJ9")])).await.unwrap();
        store.clear("whatsapp").await.unwrap();
        assert!(store.load("whatsapp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_independent() {
        let store = MemoryStore::new();
        store.save("a", &files(&[("x", "eA==")])).await.unwrap();
        assert!(store.load("b").await.unwrap().is_none());
    }
}
