// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the prompt queue.
//!
//! Routes:
//! - `GET /health`
//! - `GET /prompts?windowSize=N` current window, pending entries and backlog
//! - `POST /prompts` submit a prompt
//! - `PUT /prompts` submit a filler prompt
//! - `POST /prompts/{id}/like` like or unlike an entry
//! - `GET /prompts/trending`

pub mod handlers;
pub mod server;

pub use server::{GatewayState, router, start_server};
