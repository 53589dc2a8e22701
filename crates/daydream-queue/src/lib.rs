// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission, advancement, scheduling and maintenance for the prompt queue.
//!
//! - [`AdmissionGate`] validates submissions and enforces the backlog cap.
//! - [`Advancer`] promotes the oldest entry once the highlight has dwelt.
//! - [`QueueService`] ties them to a publisher and re-arms itself while a
//!   backlog remains.
//! - [`Sweeper`] reclaims abandoned flags and purges old entries.

pub mod admission;
pub mod advancer;
pub mod clock;
pub mod seed;
pub mod service;
pub mod sweeper;

pub use admission::{AdmissionGate, Submission};
pub use advancer::Advancer;
pub use clock::{Clock, SystemClock, TokioClock};
pub use service::QueueService;
pub use sweeper::Sweeper;
