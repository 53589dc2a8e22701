// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementing the queue and display traits.
//!
//! Mirrors the SQLite semantics (per-stream position counter, CAS claim,
//! all-or-nothing promotion commit) and can be told to fail individual
//! operations to exercise fault paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use daydream_core::{
    AdapterType, DaydreamError, DisplayState, DisplayStateStore, HealthStatus, NewQueueEntry,
    PluginAdapter, PromptQueueStore, QueueEntry, StorageAdapter, TrendingPrompt,
};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CountUnprocessed,
    AppendEntry,
    NextUnprocessed,
    PendingEntries,
    PurgeProcessed,
    AdjustLikes,
    Trending,
    LoadState,
    CreateState,
    Claim,
    CommitPromotion,
    ReleaseClaim,
    ReclaimStuck,
}

#[derive(Default)]
struct Inner {
    entries: Vec<QueueEntry>,
    next_position: HashMap<String, i64>,
    states: HashMap<String, DisplayState>,
    failing: HashSet<StoreOp>,
}

impl Inner {
    fn check(&self, op: StoreOp) -> Result<(), DaydreamError> {
        if self.failing.contains(&op) {
            Err(DaydreamError::Storage {
                source: format!("injected failure in {op:?}").into(),
            })
        } else {
            Ok(())
        }
    }

    fn unprocessed<'a>(&'a self, stream_key: &'a str) -> impl Iterator<Item = &'a QueueEntry> {
        self.entries
            .iter()
            .filter(move |e| e.stream_key == stream_key && !e.processed)
    }
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail until [`heal`](Self::heal).
    pub async fn fail_on(&self, op: StoreOp) {
        self.inner.lock().await.failing.insert(op);
    }

    pub async fn heal(&self, op: StoreOp) {
        self.inner.lock().await.failing.remove(&op);
    }

    /// All entries, processed or not, in insertion order.
    pub async fn entries(&self) -> Vec<QueueEntry> {
        self.inner.lock().await.entries.clone()
    }

    pub async fn state(&self, id: &str) -> Option<DisplayState> {
        self.inner.lock().await.states.get(id).cloned()
    }

    /// Replaces a display state wholesale, e.g. to simulate a crashed holder.
    pub async fn put_state(&self, state: DisplayState) {
        self.inner
            .lock()
            .await
            .states
            .insert(state.id.clone(), state);
    }

    /// Marks an entry processed at `at` without touching any state.
    pub async fn mark_processed(&self, entry_id: &str, at: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.entries.iter_mut().find(|e| e.id == entry_id) {
            entry.processed = true;
            entry.processed_at = Some(at);
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DaydreamError> {
        let inner = self.inner.lock().await;
        if inner.failing.is_empty() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!(
                "{} operations failing",
                inner.failing.len()
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), DaydreamError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn initialize(&self) -> Result<(), DaydreamError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DaydreamError> {
        Ok(())
    }
}

#[async_trait]
impl PromptQueueStore for MemoryStore {
    async fn count_unprocessed(&self, stream_key: &str) -> Result<u64, DaydreamError> {
        let inner = self.inner.lock().await;
        inner.check(StoreOp::CountUnprocessed)?;
        Ok(inner.unprocessed(stream_key).count() as u64)
    }

    async fn append_entry(
        &self,
        entry: NewQueueEntry,
        max_outstanding: u64,
    ) -> Result<Option<QueueEntry>, DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::AppendEntry)?;
        if inner.unprocessed(&entry.stream_key).count() as u64 >= max_outstanding {
            return Ok(None);
        }
        let counter = inner
            .next_position
            .entry(entry.stream_key.clone())
            .or_insert(0);
        let position = *counter;
        *counter += 1;

        let stored = QueueEntry {
            id: uuid::Uuid::new_v4().to_string(),
            stream_key: entry.stream_key,
            text: entry.text,
            seed: entry.seed,
            is_user: entry.is_user,
            session_id: entry.session_id,
            position,
            timestamp: entry.timestamp,
            processed: false,
            processed_at: None,
            likes: 0,
        };
        inner.entries.push(stored.clone());
        Ok(Some(stored))
    }

    async fn next_unprocessed(
        &self,
        stream_key: &str,
    ) -> Result<Option<QueueEntry>, DaydreamError> {
        let inner = self.inner.lock().await;
        inner.check(StoreOp::NextUnprocessed)?;
        Ok(inner.unprocessed(stream_key).min_by_key(|e| e.position).cloned())
    }

    async fn pending_entries(
        &self,
        stream_key: &str,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, DaydreamError> {
        let inner = self.inner.lock().await;
        inner.check(StoreOp::PendingEntries)?;
        let mut pending: Vec<QueueEntry> = inner.unprocessed(stream_key).cloned().collect();
        pending.sort_by_key(|e| e.position);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::PurgeProcessed)?;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|e| !(e.processed && e.processed_at.is_some_and(|at| at <= cutoff)));
        Ok((before - inner.entries.len()) as u64)
    }

    async fn adjust_likes(&self, entry_id: &str, delta: i64) -> Result<Option<i64>, DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::AdjustLikes)?;
        Ok(inner
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .map(|e| {
                e.likes = (e.likes + delta).max(0);
                e.likes
            }))
    }

    async fn trending(
        &self,
        stream_key: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingPrompt>, DaydreamError> {
        let inner = self.inner.lock().await;
        inner.check(StoreOp::Trending)?;
        let mut recent: Vec<&QueueEntry> = inner
            .entries
            .iter()
            .filter(|e| e.stream_key == stream_key && e.timestamp > since)
            .collect();
        recent.sort_by(|a, b| b.likes.cmp(&a.likes).then(b.timestamp.cmp(&a.timestamp)));
        Ok(recent
            .into_iter()
            .take(limit)
            .map(|e| TrendingPrompt {
                text: e.text.clone(),
                likes: e.likes,
                timestamp: e.timestamp,
            })
            .collect())
    }
}

#[async_trait]
impl DisplayStateStore for MemoryStore {
    async fn load_display_state(&self, id: &str) -> Result<Option<DisplayState>, DaydreamError> {
        let inner = self.inner.lock().await;
        inner.check(StoreOp::LoadState)?;
        Ok(inner.states.get(id).cloned())
    }

    async fn create_display_state_if_absent(
        &self,
        state: &DisplayState,
    ) -> Result<bool, DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::CreateState)?;
        if inner.states.contains_key(&state.id) {
            return Ok(false);
        }
        inner.states.insert(state.id.clone(), state.clone());
        Ok(true)
    }

    async fn try_claim(&self, id: &str, now: DateTime<Utc>) -> Result<bool, DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::Claim)?;
        match inner.states.get_mut(id) {
            Some(state) if !state.is_processing => {
                state.is_processing = true;
                state.last_updated = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_promotion(
        &self,
        state: &DisplayState,
        entry_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::CommitPromotion)?;
        match inner.states.get(&state.id) {
            None => {
                return Err(DaydreamError::NotFound {
                    kind: "display state",
                    id: state.id.clone(),
                });
            }
            Some(current) if !current.is_processing => {
                return Err(DaydreamError::Internal(format!(
                    "state {} is not claimed",
                    state.id
                )));
            }
            Some(_) => {}
        }
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id && !e.processed)
            .ok_or_else(|| DaydreamError::Internal(format!("entry {entry_id} not promotable")))?;
        entry.processed = true;
        entry.processed_at = Some(now);

        let mut committed = state.clone();
        committed.is_processing = false;
        committed.last_updated = now;
        inner.states.insert(committed.id.clone(), committed);
        Ok(())
    }

    async fn release_claim(&self, id: &str, now: DateTime<Utc>) -> Result<(), DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::ReleaseClaim)?;
        if let Some(state) = inner.states.get_mut(id) {
            state.is_processing = false;
            state.last_updated = now;
        }
        Ok(())
    }

    async fn reclaim_stuck(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, DaydreamError> {
        let mut inner = self.inner.lock().await;
        inner.check(StoreOp::ReclaimStuck)?;
        let mut reclaimed = 0;
        for state in inner.states.values_mut() {
            if state.is_processing && state.last_updated <= cutoff {
                state.is_processing = false;
                state.last_updated = now;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }
}
