// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Daydream prompt queue.

use thiserror::Error;

/// The primary error type used across store adapters, the queue services and
/// the gateway fanout.
#[derive(Debug, Error)]
pub enum DaydreamError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound gateway errors (request build failure, non-2xx status, network).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DaydreamError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        DaydreamError::Storage {
            source: Box::new(source),
        }
    }
}
