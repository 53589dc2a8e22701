// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable display window and the advisory processing flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DaydreamError;
use crate::traits::adapter::PluginAdapter;
use crate::types::DisplayState;

/// Storage for the per-stream [`DisplayState`].
///
/// The `is_processing` flag is the only mutual exclusion between concurrent
/// advancers, so [`try_claim`](Self::try_claim) must be an atomic
/// compare-and-swap in the backing store.
#[async_trait]
pub trait DisplayStateStore: PluginAdapter {
    async fn load_display_state(&self, id: &str) -> Result<Option<DisplayState>, DaydreamError>;

    /// Inserts `state` unless a record with the same id exists.
    /// Returns true if it was inserted.
    async fn create_display_state_if_absent(
        &self,
        state: &DisplayState,
    ) -> Result<bool, DaydreamError>;

    /// Sets `is_processing` from false to true and bumps `last_updated`.
    /// Returns false if the flag was already set or the record is missing.
    async fn try_claim(&self, id: &str, now: DateTime<Utc>) -> Result<bool, DaydreamError>;

    /// Writes the promoted window and marks `entry_id` processed at `now`,
    /// in one transaction. Fails without writing anything if the entry is
    /// already processed or the processing flag is no longer held.
    async fn commit_promotion(
        &self,
        state: &DisplayState,
        entry_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DaydreamError>;

    /// Clears the processing flag unconditionally.
    async fn release_claim(&self, id: &str, now: DateTime<Utc>) -> Result<(), DaydreamError>;

    /// Clears every flag whose `last_updated` is at or before `cutoff`.
    /// Returns how many records were reclaimed.
    async fn reclaim_stuck(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, DaydreamError>;
}
