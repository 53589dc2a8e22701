// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue service: owns the stores and publisher, and drives the advancer
//! with a self-re-arming timer.
//!
//! At most one timer is armed per process. Duplicate wakes while a timer is
//! pending are dropped; correctness never depends on that, because the store
//! claim is the lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use daydream_config::model::QueueConfig;
use daydream_core::{
    DaydreamError, DisplayState, DisplayStateStore, HealthStatus, LikeAction, PromptPublisher,
    PromptQueueStore, QueueSnapshot, SubmitOutcome, TickOutcome, TrendingPrompt,
};

use crate::admission::{AdmissionGate, Submission};
use crate::advancer::Advancer;
use crate::clock::{Clock, SystemClock, cutoff_before};
use crate::seed;

/// Cheaply cloneable handle to the queue.
#[derive(Clone)]
pub struct QueueService {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Arc<dyn PromptQueueStore>,
    display: Arc<dyn DisplayStateStore>,
    publisher: Arc<dyn PromptPublisher>,
    clock: Arc<dyn Clock>,
    gate: AdmissionGate,
    advancer: Advancer,
    config: QueueConfig,
    armed: AtomicBool,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl QueueService {
    pub fn new(
        queue: Arc<dyn PromptQueueStore>,
        display: Arc<dyn DisplayStateStore>,
        publisher: Arc<dyn PromptPublisher>,
        config: &QueueConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_clock(queue, display, publisher, config, cancel, Arc::new(SystemClock))
    }

    pub fn with_clock(
        queue: Arc<dyn PromptQueueStore>,
        display: Arc<dyn DisplayStateStore>,
        publisher: Arc<dyn PromptPublisher>,
        config: &QueueConfig,
        cancel: CancellationToken,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: AdmissionGate::new(Arc::clone(&queue), config),
                advancer: Advancer::new(Arc::clone(&queue), Arc::clone(&display), config),
                queue,
                display,
                publisher,
                clock,
                config: config.clone(),
                armed: AtomicBool::new(false),
                tasks: TaskTracker::new(),
                cancel,
            }),
        }
    }

    pub fn queue_store(&self) -> &Arc<dyn PromptQueueStore> {
        &self.inner.queue
    }

    pub fn display_store(&self) -> &Arc<dyn DisplayStateStore> {
        &self.inner.display
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Creates the display state seeded with the initial window if missing.
    /// Returns true if a new state was written.
    pub async fn bootstrap(&self) -> Result<bool, DaydreamError> {
        let window = seed::initial_window(&self.inner.config.initial_prompts);
        let size = window.len();
        let state = DisplayState::seeded(&self.inner.config.state_id, window, self.inner.clock.now());
        let created = self.inner.display.create_display_state_if_absent(&state).await?;
        if created {
            info!(state = %state.id, prompts = size, "display state bootstrapped");
        } else {
            debug!(state = %state.id, "display state already present");
        }
        Ok(created)
    }

    /// Admits a submission and, if accepted, wakes the advancer.
    pub async fn submit(&self, submission: Submission) -> SubmitOutcome {
        let outcome = self.inner.gate.submit_at(submission, self.inner.clock.now()).await;
        if outcome.accepted {
            self.wake();
        }
        outcome
    }

    /// Submits a random system prompt.
    pub async fn submit_filler(&self) -> SubmitOutcome {
        self.submit(Submission {
            text: seed::filler_prompt().to_string(),
            seed: seed::avatar_seed(),
            is_user: false,
            session_id: None,
        })
        .await
    }

    /// One advancer invocation. If it promoted, the new highlight is published
    /// before this returns.
    pub async fn advance(&self) -> TickOutcome {
        let outcome = self.inner.advancer.tick_at(self.inner.clock.now()).await;
        if let Some(prompt) = &outcome.highlighted {
            self.inner.publisher.publish(&prompt.text).await;
        }
        outcome
    }

    /// Schedules an advancer invocation as soon as possible.
    pub fn wake(&self) {
        arm(&self.inner, Duration::ZERO);
    }

    /// The window, the first `window_size` pending entries and the backlog size.
    pub async fn snapshot(&self, window_size: Option<usize>) -> Result<QueueSnapshot, DaydreamError> {
        let config = &self.inner.config;
        let window_size = window_size.unwrap_or(config.default_window_size);
        let state = match self.inner.display.load_display_state(&config.state_id).await? {
            Some(state) => state,
            None => DisplayState::seeded(&config.state_id, Vec::new(), self.inner.clock.now()),
        };
        let pending = self
            .inner
            .queue
            .pending_entries(&config.state_id, window_size)
            .await?;
        let backlog = self.inner.queue.count_unprocessed(&config.state_id).await?;
        Ok(QueueSnapshot {
            state,
            pending,
            backlog,
        })
    }

    /// Applies a like or unlike. Returns the new count.
    pub async fn like(&self, entry_id: &str, action: LikeAction) -> Result<i64, DaydreamError> {
        self.inner
            .queue
            .adjust_likes(entry_id, action.delta())
            .await?
            .ok_or_else(|| DaydreamError::NotFound {
                kind: "prompt",
                id: entry_id.to_string(),
            })
    }

    /// Most liked entries admitted within the trending window.
    pub async fn trending(&self) -> Result<Vec<TrendingPrompt>, DaydreamError> {
        let config = &self.inner.config;
        let since = cutoff_before(
            self.inner.clock.now(),
            config.trending_window(),
            "trending window",
        )?;
        self.inner
            .queue
            .trending(&config.state_id, since, config.trending_limit)
            .await
    }

    pub async fn health(&self) -> Result<HealthStatus, DaydreamError> {
        self.inner.queue.health_check().await
    }

    /// Stops the timer chain and waits for in-flight ticks and publishes.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        debug!("queue service stopped");
    }
}

/// Delay before the next tick, or `None` when the chain should go idle.
fn next_delay(outcome: &TickOutcome, highlight: Duration, slack: Duration) -> Option<Duration> {
    if !outcome.success {
        return Some(highlight + slack);
    }
    if outcome.remaining_backlog == 0 {
        return None;
    }
    match outcome.next_eligible_in {
        Some(wait) => Some(wait + slack),
        None => Some(highlight + slack),
    }
}

fn arm(inner: &Arc<Inner>, delay: Duration) {
    if inner.cancel.is_cancelled() {
        return;
    }
    if tokio::runtime::Handle::try_current().is_err() {
        warn!("advance not scheduled: no async runtime");
        return;
    }
    if inner.armed.swap(true, Ordering::AcqRel) {
        debug!("advance already scheduled");
        return;
    }

    let task = Arc::clone(inner);
    inner.tasks.spawn(async move {
        tokio::select! {
            _ = task.cancel.cancelled() => {
                task.armed.store(false, Ordering::Release);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        task.armed.store(false, Ordering::Release);

        let outcome = task.advancer.tick_at(task.clock.now()).await;
        if let Some(prompt) = outcome.highlighted.clone() {
            let publisher = Arc::clone(&task.publisher);
            task.tasks.spawn(async move {
                publisher.publish(&prompt.text).await;
            });
        }

        let highlight = task.advancer.highlight_duration();
        match next_delay(&outcome, highlight, task.config.schedule_slack()) {
            Some(next) => {
                debug!(
                    delay_ms = next.as_millis() as u64,
                    backlog = outcome.remaining_backlog,
                    "advance re-armed"
                );
                arm(&task, next);
            }
            None => debug!("advance chain idle"),
        }
    });
}
