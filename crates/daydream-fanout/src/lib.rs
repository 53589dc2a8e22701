// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway fanout publisher.
//!
//! Each promoted prompt is parsed for inline directives, rendered into the
//! fixed workflow body and POSTed to every configured stream target at once.

pub mod directives;
pub mod publisher;
pub mod registry;
pub mod retry;
pub mod workflow;

pub use directives::Directives;
pub use publisher::{FanoutReport, GatewayFanout, TargetFailure};
pub use registry::GatewayRegistry;
pub use retry::RetryPolicy;
