// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue advancer: promotes the oldest pending entry into the highlight.
//!
//! Mutual exclusion between concurrent advancers (in this process or any
//! other) is the store's compare-and-swap on `is_processing`. After winning
//! the claim the state and head entry are read again, so a decision made on
//! a stale read is never committed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use daydream_config::model::QueueConfig;
use daydream_core::{
    DaydreamError, DisplayState, DisplayStateStore, DisplayedPrompt, PromptQueueStore,
    TickOutcome,
};

pub struct Advancer {
    queue: Arc<dyn PromptQueueStore>,
    display: Arc<dyn DisplayStateStore>,
    state_id: String,
    highlight: Duration,
    capacity: usize,
}

impl Advancer {
    pub fn new(
        queue: Arc<dyn PromptQueueStore>,
        display: Arc<dyn DisplayStateStore>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            queue,
            display,
            state_id: config.state_id.clone(),
            highlight: config.highlight_duration(),
            capacity: config.display_capacity,
        }
    }

    pub fn highlight_duration(&self) -> Duration {
        self.highlight
    }

    /// One advancement attempt at `now`. Faults are logged and reported as
    /// `success = false`; this never returns an error.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        match self.try_tick(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(state = %self.state_id, error = %e, "advance failed");
                TickOutcome::failed()
            }
        }
    }

    async fn try_tick(&self, now: DateTime<Utc>) -> Result<TickOutcome, DaydreamError> {
        let Some(state) = self.display.load_display_state(&self.state_id).await? else {
            let empty = DisplayState::seeded(&self.state_id, Vec::new(), now);
            self.display.create_display_state_if_absent(&empty).await?;
            debug!(state = %self.state_id, "display state created empty");
            let backlog = self.queue.count_unprocessed(&self.state_id).await?;
            return Ok(TickOutcome::unpromoted(backlog));
        };

        if state.is_processing {
            debug!(state = %self.state_id, "advance skipped: another holder is processing");
            let backlog = self.queue.count_unprocessed(&self.state_id).await?;
            return Ok(TickOutcome::unpromoted(backlog));
        }

        if let Some(wait) = state.gate_remaining(now, self.highlight) {
            let backlog = self.queue.count_unprocessed(&self.state_id).await?;
            debug!(wait_ms = wait.as_millis() as u64, backlog, "advance gated");
            return Ok(TickOutcome::gated(backlog, wait));
        }

        if self.queue.next_unprocessed(&self.state_id).await?.is_none() {
            return Ok(TickOutcome::unpromoted(0));
        }

        if !self.display.try_claim(&self.state_id, now).await? {
            debug!(state = %self.state_id, "advance skipped: lost the claim");
            let backlog = self.queue.count_unprocessed(&self.state_id).await?;
            return Ok(TickOutcome::unpromoted(backlog));
        }

        match self.promote_claimed(now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(release_err) = self.display.release_claim(&self.state_id, now).await {
                    warn!(
                        state = %self.state_id,
                        error = %release_err,
                        "could not release processing flag; leaving it for the sweeper"
                    );
                }
                Err(e)
            }
        }
    }

    /// Runs with the flag held. Every early return must release it.
    async fn promote_claimed(&self, now: DateTime<Utc>) -> Result<TickOutcome, DaydreamError> {
        let mut state = self
            .display
            .load_display_state(&self.state_id)
            .await?
            .ok_or_else(|| DaydreamError::NotFound {
                kind: "display state",
                id: self.state_id.clone(),
            })?;

        if let Some(wait) = state.gate_remaining(now, self.highlight) {
            self.display.release_claim(&self.state_id, now).await?;
            let backlog = self.queue.count_unprocessed(&self.state_id).await?;
            return Ok(TickOutcome::gated(backlog, wait));
        }

        let Some(entry) = self.queue.next_unprocessed(&self.state_id).await? else {
            self.display.release_claim(&self.state_id, now).await?;
            return Ok(TickOutcome::unpromoted(0));
        };

        let prompt = DisplayedPrompt::from(&entry);
        state.promote(prompt.clone(), now, self.capacity);
        self.display
            .commit_promotion(&state, &entry.id, now)
            .await?;

        // The promotion is durable at this point; a failed count must not
        // turn it into a fault, so assume backlog and let the chain re-check.
        let remaining = match self.queue.count_unprocessed(&self.state_id).await {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(error = %e, "backlog count failed after promotion");
                1
            }
        };

        info!(
            position = entry.position,
            id = %entry.id,
            is_user = entry.is_user,
            remaining,
            "prompt promoted"
        );
        Ok(TickOutcome::promoted(prompt, remaining))
    }
}
