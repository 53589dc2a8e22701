// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage and store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use daydream_config::model::StorageConfig;
use daydream_core::{
    AdapterType, DaydreamError, DisplayState, DisplayStateStore, HealthStatus, NewQueueEntry,
    PluginAdapter, PromptQueueStore, QueueEntry, StorageAdapter, TrendingPrompt,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, DaydreamError> {
        self.db.get().ok_or_else(|| DaydreamError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DaydreamError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DaydreamError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), DaydreamError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| DaydreamError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DaydreamError> {
        self.db()?.close().await
    }
}

#[async_trait]
impl PromptQueueStore for SqliteStorage {
    async fn count_unprocessed(&self, stream_key: &str) -> Result<u64, DaydreamError> {
        queries::queue::count_unprocessed(self.db()?, stream_key).await
    }

    async fn append_entry(
        &self,
        entry: NewQueueEntry,
        max_outstanding: u64,
    ) -> Result<Option<QueueEntry>, DaydreamError> {
        queries::queue::append_entry(self.db()?, entry, max_outstanding).await
    }

    async fn next_unprocessed(
        &self,
        stream_key: &str,
    ) -> Result<Option<QueueEntry>, DaydreamError> {
        queries::queue::next_unprocessed(self.db()?, stream_key).await
    }

    async fn pending_entries(
        &self,
        stream_key: &str,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, DaydreamError> {
        queries::queue::pending_entries(self.db()?, stream_key, limit).await
    }

    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DaydreamError> {
        queries::queue::purge_processed_before(self.db()?, cutoff).await
    }

    async fn adjust_likes(&self, entry_id: &str, delta: i64) -> Result<Option<i64>, DaydreamError> {
        queries::queue::adjust_likes(self.db()?, entry_id, delta).await
    }

    async fn trending(
        &self,
        stream_key: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingPrompt>, DaydreamError> {
        queries::queue::trending(self.db()?, stream_key, since, limit).await
    }
}

#[async_trait]
impl DisplayStateStore for SqliteStorage {
    async fn load_display_state(&self, id: &str) -> Result<Option<DisplayState>, DaydreamError> {
        queries::display::load_display_state(self.db()?, id).await
    }

    async fn create_display_state_if_absent(
        &self,
        state: &DisplayState,
    ) -> Result<bool, DaydreamError> {
        queries::display::create_display_state_if_absent(self.db()?, state).await
    }

    async fn try_claim(&self, id: &str, now: DateTime<Utc>) -> Result<bool, DaydreamError> {
        queries::display::try_claim(self.db()?, id, now).await
    }

    async fn commit_promotion(
        &self,
        state: &DisplayState,
        entry_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DaydreamError> {
        queries::display::commit_promotion(self.db()?, state, entry_id, now).await
    }

    async fn release_claim(&self, id: &str, now: DateTime<Utc>) -> Result<(), DaydreamError> {
        queries::display::release_claim(self.db()?, id, now).await
    }

    async fn reclaim_stuck(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, DaydreamError> {
        queries::display::reclaim_stuck(self.db()?, cutoff, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_tracks_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn queue_and_state_through_trait_objects() {
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let db_path = dir.path().join("traits.db");
        let storage = Arc::new(SqliteStorage::new(make_config(db_path.to_str().unwrap())));
        storage.initialize().await.unwrap();

        let queue: Arc<dyn PromptQueueStore> = storage.clone();
        let display: Arc<dyn DisplayStateStore> = storage.clone();

        let now = Utc::now();
        display
            .create_display_state_if_absent(&DisplayState::seeded("main", Vec::new(), now))
            .await
            .unwrap();
        let entry = queue
            .append_entry(
                NewQueueEntry {
                    stream_key: "main".to_string(),
                    text: "a foggy harbor".to_string(),
                    seed: "seed".to_string(),
                    is_user: true,
                    session_id: None,
                    timestamp: now,
                },
                100,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.position, 0);
        assert!(display.try_claim("main", now).await.unwrap());

        storage.shutdown().await.unwrap();
    }
}
