// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery of a newly highlighted prompt.

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;

/// Delivers prompt updates to the live generation endpoints.
///
/// Delivery faults are absorbed by the implementation: the advancer never
/// learns whether a publish reached anyone.
#[async_trait]
pub trait PromptPublisher: PluginAdapter {
    async fn publish(&self, prompt_text: &str);
}
