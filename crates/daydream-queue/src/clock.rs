// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock source for highlight gating and timestamps.

use std::time::Duration;

use chrono::{DateTime, Utc};

use daydream_core::DaydreamError;

/// Supplies the current UTC time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// UTC time derived from the tokio clock, anchored when created.
///
/// Follows `tokio::time::pause` and `advance`, so timer-driven behavior can
/// be tested without sleeping.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor_utc: DateTime<Utc>,
    anchor: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(anchor_utc: DateTime<Utc>) -> Self {
        Self {
            anchor_utc,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now().duration_since(self.anchor);
        self.anchor_utc + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }
}

/// `now - span`, or a config error if the result leaves chrono's range.
pub fn cutoff_before(
    now: DateTime<Utc>,
    span: Duration,
    what: &str,
) -> Result<DateTime<Utc>, DaydreamError> {
    chrono::Duration::from_std(span)
        .ok()
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| DaydreamError::Config(format!("{what} of {span:?} is out of range")))
}
