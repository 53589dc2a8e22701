// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Daydream live prompt queue.
//!
//! This crate provides the error type, the domain types and the adapter
//! traits shared by the store backends, the queue services and the gateway
//! fanout. Every adapter implements traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DaydreamError;
pub use types::{
    AdapterType, DisplayState, DisplayedPrompt, HealthStatus, LikeAction, NewQueueEntry,
    QueueEntry, QueueSnapshot, RejectReason, SubmitOutcome, SweepReport, TickOutcome,
    TrendingPrompt, format_timestamp, parse_timestamp,
};

pub use traits::{
    DisplayStateStore, PluginAdapter, PromptPublisher, PromptQueueStore, StorageAdapter,
};
