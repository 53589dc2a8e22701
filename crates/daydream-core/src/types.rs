// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store adapters, queue services and HTTP surface.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp layout used for persisted values. Fixed width, so stored values
/// order lexically in the same order as chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats a UTC timestamp in the persisted layout.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp previously written by [`format_timestamp`].
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Publisher,
}

/// A single pending or processed prompt submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: String,
    pub stream_key: String,
    pub text: String,
    pub seed: String,
    pub is_user: bool,
    pub session_id: Option<String>,
    /// FIFO order within a stream. Strictly increasing, never reused.
    pub position: i64,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub likes: i64,
}

/// Input for the admission insert. Position and id are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub stream_key: String,
    pub text: String,
    pub seed: String,
    pub is_user: bool,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One row of the on-screen window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayedPrompt {
    pub text: String,
    pub seed: String,
    pub is_user: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl From<&QueueEntry> for DisplayedPrompt {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            text: entry.text.clone(),
            seed: entry.seed.clone(),
            is_user: entry.is_user,
            session_id: entry.session_id.clone(),
        }
    }
}

/// The sliding window of displayed prompts for one stream.
///
/// `displayed[0]` is the highlighted (live) prompt. `is_processing` together
/// with `last_updated` forms an advisory lock that only the store mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub id: String,
    pub displayed: VecDeque<DisplayedPrompt>,
    pub highlighted_since: DateTime<Utc>,
    pub is_processing: bool,
    pub last_updated: DateTime<Utc>,
}

impl DisplayState {
    /// A fresh, unlocked state whose window holds `initial` in order.
    pub fn seeded(id: &str, initial: Vec<DisplayedPrompt>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            displayed: initial.into(),
            highlighted_since: now,
            is_processing: false,
            last_updated: now,
        }
    }

    /// The currently highlighted prompt, if any.
    pub fn highlighted(&self) -> Option<&DisplayedPrompt> {
        self.displayed.front()
    }

    /// Time left before the highlight gate opens, or `None` if it is open.
    pub fn gate_remaining(&self, now: DateTime<Utc>, highlight: Duration) -> Option<Duration> {
        let elapsed = (now - self.highlighted_since).to_std().unwrap_or(Duration::ZERO);
        if elapsed < highlight {
            Some(highlight - elapsed)
        } else {
            None
        }
    }

    /// Pushes `prompt` onto the front of the window and makes it the highlight.
    ///
    /// The window is truncated to `capacity` entries; a capacity of zero
    /// leaves it unbounded. Clears the processing flag.
    pub fn promote(&mut self, prompt: DisplayedPrompt, now: DateTime<Utc>, capacity: usize) {
        self.displayed.push_front(prompt);
        if capacity > 0 {
            self.displayed.truncate(capacity);
        }
        self.highlighted_since = now;
        self.is_processing = false;
        self.last_updated = now;
    }
}

/// Why the admission gate turned a submission away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// Outstanding backlog has reached the configured maximum.
    QueueFull,
    /// Text or seed failed validation.
    InvalidInput,
    /// The durable write failed.
    StoreUnavailable,
}

/// Result of one admission attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub accepted: bool,
    pub position: Option<i64>,
    pub entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectReason>,
}

impl SubmitOutcome {
    pub fn accepted(entry: &QueueEntry) -> Self {
        Self {
            accepted: true,
            position: Some(entry.position),
            entry_id: Some(entry.id.clone()),
            rejection: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            position: None,
            entry_id: None,
            rejection: Some(reason),
        }
    }
}

/// Result of one advancer invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// False when a store fault interrupted the invocation.
    pub success: bool,
    pub promoted: bool,
    pub remaining_backlog: u64,
    /// The new highlight when `promoted` is true.
    pub highlighted: Option<DisplayedPrompt>,
    /// Set when the highlight gate was still closed.
    pub next_eligible_in: Option<Duration>,
}

impl TickOutcome {
    pub fn unpromoted(remaining_backlog: u64) -> Self {
        Self {
            success: true,
            promoted: false,
            remaining_backlog,
            highlighted: None,
            next_eligible_in: None,
        }
    }

    pub fn gated(remaining_backlog: u64, wait: Duration) -> Self {
        Self {
            next_eligible_in: Some(wait),
            ..Self::unpromoted(remaining_backlog)
        }
    }

    pub fn promoted(prompt: DisplayedPrompt, remaining_backlog: u64) -> Self {
        Self {
            success: true,
            promoted: true,
            remaining_backlog,
            highlighted: Some(prompt),
            next_eligible_in: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            ..Self::unpromoted(0)
        }
    }
}

/// Counts from one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub reclaimed_flags: u64,
    pub purged_entries: u64,
}

/// Read-side view returned to the UI: the window plus the head of the backlog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    #[serde(flatten)]
    pub state: DisplayState,
    pub pending: Vec<QueueEntry>,
    pub backlog: u64,
}

/// An entry ranked by likes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPrompt {
    pub text: String,
    pub likes: i64,
    pub timestamp: DateTime<Utc>,
}

/// Direction of a like adjustment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LikeAction {
    #[default]
    Like,
    Unlike,
}

impl LikeAction {
    pub fn delta(self) -> i64 {
        match self {
            LikeAction::Like => 1,
            LikeAction::Unlike => -1,
        }
    }
}
