// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission gate: validates submissions and appends them to the queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use daydream_config::model::QueueConfig;
use daydream_core::{NewQueueEntry, PromptQueueStore, RejectReason, SubmitOutcome};

/// A prompt as handed in by a caller.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub text: String,
    pub seed: String,
    pub is_user: bool,
    pub session_id: Option<String>,
}

/// Validates and appends submissions, enforcing the backlog cap.
pub struct AdmissionGate {
    store: Arc<dyn PromptQueueStore>,
    stream_key: String,
    max_queue_size: u64,
    max_prompt_chars: usize,
}

impl AdmissionGate {
    pub fn new(store: Arc<dyn PromptQueueStore>, config: &QueueConfig) -> Self {
        Self {
            store,
            stream_key: config.state_id.clone(),
            max_queue_size: config.max_queue_size,
            max_prompt_chars: config.max_prompt_chars,
        }
    }

    /// Admits `submission` at `now`. Never errors: every failure is an outcome.
    pub async fn submit_at(&self, submission: Submission, now: DateTime<Utc>) -> SubmitOutcome {
        let text = submission.text.trim();
        let seed = submission.seed.trim();
        if text.is_empty() || seed.is_empty() {
            debug!("submission rejected: empty text or seed");
            return SubmitOutcome::rejected(RejectReason::InvalidInput);
        }
        let chars = text.chars().count();
        if chars > self.max_prompt_chars {
            debug!(chars, max = self.max_prompt_chars, "submission rejected: too long");
            return SubmitOutcome::rejected(RejectReason::InvalidInput);
        }

        let entry = NewQueueEntry {
            stream_key: self.stream_key.clone(),
            text: text.to_string(),
            seed: seed.to_string(),
            is_user: submission.is_user,
            session_id: submission.session_id.filter(|s| !s.is_empty()),
            timestamp: now,
        };

        match self.store.append_entry(entry, self.max_queue_size).await {
            Ok(Some(entry)) => {
                info!(
                    position = entry.position,
                    id = %entry.id,
                    is_user = entry.is_user,
                    "prompt admitted"
                );
                SubmitOutcome::accepted(&entry)
            }
            Ok(None) => {
                info!(max = self.max_queue_size, "prompt rejected: queue full");
                SubmitOutcome::rejected(RejectReason::QueueFull)
            }
            Err(e) => {
                warn!(error = %e, "prompt rejected: store unavailable");
                SubmitOutcome::rejected(RejectReason::StoreUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daydream_test_utils::{MemoryStore, StoreOp};
    use tracing_test::traced_test;

    fn gate(store: Arc<MemoryStore>, max: u64) -> AdmissionGate {
        let config = QueueConfig {
            max_queue_size: max,
            max_prompt_chars: 20,
            ..QueueConfig::default()
        };
        AdmissionGate::new(store, &config)
    }

    fn submission(text: &str) -> Submission {
        Submission {
            text: text.to_string(),
            seed: "user-abc123".to_string(),
            is_user: true,
            session_id: Some("session-1".to_string()),
        }
    }

    #[tokio::test]
    async fn accepted_positions_increase() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone(), 10);

        let mut positions = Vec::new();
        for text in ["a", "b", "c"] {
            let outcome = gate.submit_at(submission(text), Utc::now()).await;
            assert!(outcome.accepted);
            assert!(outcome.entry_id.is_some());
            positions.push(outcome.position.unwrap());
        }
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn rejects_when_full_without_disturbing_positions() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone(), 2);

        gate.submit_at(submission("a"), Utc::now()).await;
        let b = gate.submit_at(submission("b"), Utc::now()).await;
        let full = gate.submit_at(submission("c"), Utc::now()).await;
        assert!(!full.accepted);
        assert_eq!(full.rejection, Some(RejectReason::QueueFull));
        assert_eq!(full.position, None);

        store
            .mark_processed(b.entry_id.as_deref().unwrap(), Utc::now())
            .await;
        let d = gate.submit_at(submission("d"), Utc::now()).await;
        assert_eq!(d.position, Some(2));
    }

    #[tokio::test]
    async fn trims_and_validates_input() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone(), 10);

        let blank = gate.submit_at(submission("   "), Utc::now()).await;
        assert_eq!(blank.rejection, Some(RejectReason::InvalidInput));

        let mut no_seed = submission("a lake");
        no_seed.seed = " ".to_string();
        let no_seed = gate.submit_at(no_seed, Utc::now()).await;
        assert_eq!(no_seed.rejection, Some(RejectReason::InvalidInput));

        let long = gate.submit_at(submission(&"x".repeat(21)), Utc::now()).await;
        assert_eq!(long.rejection, Some(RejectReason::InvalidInput));

        let ok = gate.submit_at(submission("  a lake  "), Utc::now()).await;
        assert!(ok.accepted);
        assert_eq!(store.entries().await[0].text, "a lake");
    }

    #[tokio::test]
    #[traced_test]
    async fn full_queue_is_logged_with_cap() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone(), 1);

        gate.submit_at(submission("a"), Utc::now()).await;
        gate.submit_at(submission("b"), Utc::now()).await;
        assert!(logs_contain("prompt admitted"));
        assert!(logs_contain("prompt rejected: queue full"));
        assert!(logs_contain("max=1"));
    }

    #[tokio::test]
    async fn store_failure_is_not_accepted() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on(StoreOp::AppendEntry).await;
        let gate = gate(store.clone(), 10);

        let outcome = gate.submit_at(submission("a"), Utc::now()).await;
        assert!(!outcome.accepted);
        assert_eq!(outcome.position, None);
        assert_eq!(outcome.rejection, Some(RejectReason::StoreUnavailable));
    }
}
