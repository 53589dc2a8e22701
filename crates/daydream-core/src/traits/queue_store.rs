// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable queue of pending prompt submissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DaydreamError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{NewQueueEntry, QueueEntry, TrendingPrompt};

/// Ordered, durable list of submissions keyed by stream.
///
/// Positions are assigned by the store and are strictly increasing per stream
/// key. Implementations must never hand out the same position twice, even
/// under concurrent appends.
#[async_trait]
pub trait PromptQueueStore: PluginAdapter {
    /// Number of entries with `processed = false` for the stream.
    async fn count_unprocessed(&self, stream_key: &str) -> Result<u64, DaydreamError>;

    /// Appends an entry at the next position of the stream (0 for a new stream).
    ///
    /// The outstanding-count check, the position lookup and the insert run
    /// atomically. Returns `None` when `max_outstanding` unprocessed entries
    /// already exist.
    async fn append_entry(
        &self,
        entry: NewQueueEntry,
        max_outstanding: u64,
    ) -> Result<Option<QueueEntry>, DaydreamError>;

    /// The unprocessed entry with the lowest position.
    async fn next_unprocessed(&self, stream_key: &str)
    -> Result<Option<QueueEntry>, DaydreamError>;

    /// Up to `limit` unprocessed entries in position order.
    async fn pending_entries(
        &self,
        stream_key: &str,
        limit: usize,
    ) -> Result<Vec<QueueEntry>, DaydreamError>;

    /// Deletes processed entries whose `processed_at` is at or before `cutoff`.
    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DaydreamError>;

    /// Adds `delta` to an entry's like count, flooring at zero.
    ///
    /// Returns the new count, or `None` if no entry has that id.
    async fn adjust_likes(&self, entry_id: &str, delta: i64) -> Result<Option<i64>, DaydreamError>;

    /// Entries admitted after `since`, most liked first.
    async fn trending(
        &self,
        stream_key: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingPrompt>, DaydreamError>;
}
