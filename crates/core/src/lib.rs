// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! concord-core: in-process coordination primitives
//!
//! This crate provides:
//! - A jitter-tolerant monotonic clock for timeout arithmetic
//! - Shared/exclusive access gates, reentrant and non-reentrant
//! - Scoped acquisition guards for gates

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;

pub use clock::{Clock, FakeClock, SafeClock, SystemClock};
pub use config::ClockConfig;
pub use error::{ConfigError, GateError};
pub use gate::{
    ContenderId, ContenderRef, ContenderView, Gate, GateSnapshot, GateStatus, LiteContender,
    NonReentrantGate, NoopGate, ReentrantGate, Sentry, SentryAction, Timeout, Token,
};
