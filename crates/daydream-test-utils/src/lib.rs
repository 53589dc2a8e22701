// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Daydream integration tests.
//!
//! Provides in-memory adapters so queue and HTTP tests run fast and
//! deterministically without a database or live gateways.
//!
//! # Components
//!
//! - [`MemoryStore`] - In-memory queue and display store with fault injection
//! - [`RecordingPublisher`] - Publisher that records every prompt it is handed

pub mod memory_store;
pub mod recording_publisher;

pub use memory_store::{MemoryStore, StoreOp};
pub use recording_publisher::RecordingPublisher;
