// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher double that records what it is asked to deliver.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use daydream_core::{AdapterType, DaydreamError, HealthStatus, PluginAdapter, PromptPublisher};

/// Records every published prompt text in order.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<String>>,
    notify: Arc<Notify>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far.
    pub async fn published(&self) -> Vec<String> {
        self.published.lock().await.clone()
    }

    /// Waits until at least `count` prompts have been published.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        loop {
            let notified = self.notify.notified();
            {
                let published = self.published.lock().await;
                if published.len() >= count {
                    return published.clone();
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl PluginAdapter for RecordingPublisher {
    fn name(&self) -> &str {
        "recording-publisher"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Publisher
    }

    async fn health_check(&self) -> Result<HealthStatus, DaydreamError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DaydreamError> {
        Ok(())
    }
}

#[async_trait]
impl PromptPublisher for RecordingPublisher {
    async fn publish(&self, prompt_text: &str) {
        self.published.lock().await.push(prompt_text.to_string());
        self.notify.notify_waiters();
    }
}
