// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod display_store;
pub mod publisher;
pub mod queue_store;
pub mod storage;

pub use adapter::PluginAdapter;
pub use display_store::DisplayStateStore;
pub use publisher::PromptPublisher;
pub use queue_store::PromptQueueStore;
pub use storage::StorageAdapter;
