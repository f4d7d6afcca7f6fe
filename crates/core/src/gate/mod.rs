// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared/exclusive access gates
//!
//! A gate lets large numbers of contenders `enter` and `exit` concurrently,
//! while occasionally one contender `close`s it to gain exclusive access.
//! Closing waits for everyone else inside to exit; once closed the gate can
//! be re-opened or permanently destroyed.
//!
//! This module provides:
//! - **ReentrantGate** - nested enter/close by the same thread or explicit contender
//! - **NonReentrantGate** - no per-contender bookkeeping, much cheaper
//! - **NoopGate** - never blocks, for places that need a gate but no coordination
//! - **Sentry** - scoped acquisition that releases on drop
//!
//! A gate may carry the resource it protects (`with_resource`); a sentry
//! dereferences to it, so a scoped enter or close hands back the guarded value.
//!
//! A contender must never hold one gate closed while blocking on another.

mod contender;
mod non_reentrant;
mod noop;
mod reentrant;
mod sentry;
mod state;

pub use contender::{ContenderId, ContenderRef, ContenderView, LiteContender, Token};
pub use non_reentrant::NonReentrantGate;
pub use noop::NoopGate;
pub use reentrant::ReentrantGate;
pub use sentry::{Sentry, SentryAction};

use crate::error::GateError;
use std::fmt;
use std::time::Duration;

/// How long a blocking gate operation may wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until the operation succeeds
    Infinite,
    /// Wait at most this many milliseconds; zero means do not wait
    Millis(u64),
}

impl Timeout {
    /// Do not wait at all
    pub const NONE: Timeout = Timeout::Millis(0);

    /// Interpret a millisecond budget: negative waits forever, zero does not wait.
    pub fn from_millis(millis: i64) -> Self {
        u64::try_from(millis).map_or(Timeout::Infinite, Timeout::Millis)
    }

    /// True when no waiting time remains
    pub fn is_expired(&self) -> bool {
        matches!(self, Timeout::Millis(0))
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::Millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Gate lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GateStatus {
    /// Contenders may enter and exit
    Open = 0,
    /// A closer is waiting for everyone else to exit; no new entries
    Closing = 1,
    /// The closer has exclusive access
    Closed = 2,
    /// Terminal; every further operation fails
    Destroyed = 3,
}

impl GateStatus {
    pub fn name(&self) -> &'static str {
        match self {
            GateStatus::Open => "OPEN",
            GateStatus::Closing => "CLOSING",
            GateStatus::Closed => "CLOSED",
            GateStatus::Destroyed => "DESTROYED",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point-in-time view of a gate, used for diagnostics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateSnapshot {
    pub status: GateStatus,
    pub active_count: u64,
    pub close_count: u32,
    pub closer: Option<ContenderId>,
}

impl fmt::Display for GateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gate{{status={}, active={}, close_count={}, closer=",
            self.status, self.active_count, self.close_count
        )?;
        match self.closer {
            Some(closer) => write!(f, "{}}}", closer),
            None => write!(f, "none}}"),
        }
    }
}

/// Shared/exclusive access coordinator. Operations act on behalf of the
/// calling thread.
pub trait Gate: Send + Sync {
    /// The value this gate protects; `()` when it guards nothing in particular
    type Resource: ?Sized;

    /// The protected value. Callers are expected to hold an entry or the
    /// closer role while using it.
    fn resource(&self) -> &Self::Resource;

    /// Acquire shared access, waiting up to `timeout` for the gate to open.
    ///
    /// Returns `Ok(false)` on timeout.
    fn enter(&self, timeout: Timeout) -> Result<bool, GateError>;

    /// Release one shared entry obtained by [`Gate::enter`].
    fn exit(&self) -> Result<(), GateError>;

    /// Acquire exclusive access, waiting up to `timeout` for all other
    /// contenders to exit. On timeout the gate is re-opened and `Ok(false)`
    /// is returned.
    fn close(&self, timeout: Timeout) -> Result<bool, GateError>;

    /// Release one exclusive hold obtained by [`Gate::close`] or [`Gate::bar_entry`].
    fn open(&self) -> Result<(), GateError>;

    /// Claim the closer role and block future entries without waiting for
    /// current contenders to exit.
    fn bar_entry(&self, timeout: Timeout) -> Result<bool, GateError>;

    /// Permanently close the gate. Only the closer of a closed gate may do this.
    fn destroy(&self) -> Result<(), GateError>;

    fn is_closed(&self) -> bool;

    fn is_closed_by_current_thread(&self) -> bool;

    fn is_entered_by_current_thread(&self) -> bool;

    /// Number of contenders currently entered
    fn active_count(&self) -> u64;

    /// Enter, waiting forever, and exit when the sentry drops.
    fn enter_scoped(&self) -> Result<Sentry<'_, Self>, GateError> {
        while !self.enter(Timeout::Infinite)? {}
        Ok(Sentry::new(self, SentryAction::Exit))
    }

    /// Enter within `timeout`; `None` on timeout.
    fn try_enter_scoped(&self, timeout: Timeout) -> Result<Option<Sentry<'_, Self>>, GateError> {
        Ok(self
            .enter(timeout)?
            .then(|| Sentry::new(self, SentryAction::Exit)))
    }

    /// Close, waiting forever, and open when the sentry drops.
    fn close_scoped(&self) -> Result<Sentry<'_, Self>, GateError> {
        while !self.close(Timeout::Infinite)? {}
        Ok(Sentry::new(self, SentryAction::Open))
    }

    /// Close within `timeout`; `None` on timeout.
    fn try_close_scoped(&self, timeout: Timeout) -> Result<Option<Sentry<'_, Self>>, GateError> {
        Ok(self
            .close(timeout)?
            .then(|| Sentry::new(self, SentryAction::Open)))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
