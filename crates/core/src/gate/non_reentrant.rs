// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-reentrant gate
//!
//! Keeps no per-contender enter counts, so entering is a single CAS on the
//! common path. Nested entries each count separately, a contender may not
//! close a gate it has entered, and the closer blocks like anyone else if it
//! enters its own closed gate.

use super::contender::{ContenderId, ContenderRef, ContenderView};
use super::state::GateCore;
use super::{Gate, GateSnapshot, GateStatus, Timeout};
use crate::error::GateError;
use std::fmt;

#[derive(Debug)]
pub struct NonReentrantGate<R = ()> {
    core: GateCore,
    resource: R,
}

impl NonReentrantGate {
    pub fn new() -> Self {
        Self::with_resource(())
    }
}

impl<R> NonReentrantGate<R> {
    /// A gate protecting `resource`.
    pub fn with_resource(resource: R) -> Self {
        Self {
            core: GateCore::new(),
            resource,
        }
    }

    pub fn into_resource(self) -> R {
        self.resource
    }

    pub fn status(&self) -> GateStatus {
        self.core.status()
    }

    pub fn close_count(&self) -> u32 {
        self.core.close_count()
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.core.snapshot()
    }

    pub fn close_as<'a>(
        &self,
        contender: impl Into<ContenderRef<'a>>,
        timeout: Timeout,
    ) -> Result<bool, GateError> {
        self.core.close(contender.into().id(), 0, timeout)
    }

    pub fn open_as<'a>(&self, contender: impl Into<ContenderRef<'a>>) -> Result<(), GateError> {
        self.core.open(contender.into().id())
    }

    pub fn bar_entry_as<'a>(
        &self,
        contender: impl Into<ContenderRef<'a>>,
        timeout: Timeout,
    ) -> Result<bool, GateError> {
        self.core.bar_entry(contender.into().id(), timeout)
    }

    pub fn destroy_as<'a>(&self, contender: impl Into<ContenderRef<'a>>) -> Result<(), GateError> {
        self.core.destroy(contender.into().id())
    }

    pub fn is_closed_by<'a>(&self, contender: impl Into<ContenderView<'a>>) -> bool {
        self.core.is_closed_by(contender.into().id())
    }
}

impl Default for NonReentrantGate {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync> Gate for NonReentrantGate<R> {
    type Resource = R;

    fn resource(&self) -> &R {
        &self.resource
    }

    fn enter(&self, timeout: Timeout) -> Result<bool, GateError> {
        if self.core.try_enter_open() {
            return Ok(true);
        }
        self.core.enter_wait(timeout)
    }

    fn exit(&self) -> Result<(), GateError> {
        self.core.release_entry().inspect_err(|e| {
            tracing::warn!(gate = %e.snapshot(), "exit without a matching enter");
        })
    }

    fn close(&self, timeout: Timeout) -> Result<bool, GateError> {
        self.core.close(ContenderId::current_thread(), 0, timeout)
    }

    fn open(&self) -> Result<(), GateError> {
        self.core.open(ContenderId::current_thread())
    }

    fn bar_entry(&self, timeout: Timeout) -> Result<bool, GateError> {
        self.core.bar_entry(ContenderId::current_thread(), timeout)
    }

    fn destroy(&self) -> Result<(), GateError> {
        self.core.destroy(ContenderId::current_thread())
    }

    fn is_closed(&self) -> bool {
        self.core.status() == GateStatus::Closed
    }

    fn is_closed_by_current_thread(&self) -> bool {
        self.core.is_closed_by(ContenderId::current_thread())
    }

    /// Always false; entries are not attributed to contenders.
    fn is_entered_by_current_thread(&self) -> bool {
        false
    }

    fn active_count(&self) -> u64 {
        self.core.active_count()
    }
}

impl<R> fmt::Display for NonReentrantGate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonReentrantGate::{}", self.core.snapshot())
    }
}

#[cfg(test)]
#[path = "non_reentrant_tests.rs"]
mod tests;
