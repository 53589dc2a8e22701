// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage lifecycle trait for persistence backends.

use async_trait::async_trait;

use crate::error::DaydreamError;
use crate::traits::adapter::PluginAdapter;

/// Lifecycle hooks for a persistence backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), DaydreamError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), DaydreamError>;
}
