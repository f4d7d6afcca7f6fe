// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reentrant gate
//!
//! Enter/exit and close/open may be nested by the same contender, and the
//! contender that closed the gate may keep entering and exiting it while it
//! is closed. A contender's nested entries count once towards the gate's
//! active count.
//!
//! A gate may protect a resource; scoped acquisitions hand it back through
//! the [`super::Sentry`].

use super::contender::{with_thread_enters, ContenderId, ContenderRef, ContenderView};
use super::state::GateCore;
use super::{Gate, GateSnapshot, GateStatus, Timeout};
use crate::error::GateError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::OnceLock;

/// Who an internal operation acts for
enum Holder<'c, 'a> {
    Thread,
    Contender(&'c mut ContenderRef<'a>),
}

/// A gate supporting nested entry and closure by threads and explicit contenders.
#[derive(Debug)]
pub struct ReentrantGate<R = ()> {
    core: GateCore,
    /// Enter counts for [`super::Token`] contenders, created on first use
    token_enters: OnceLock<DashMap<ContenderId, u64>>,
    resource: R,
}

impl ReentrantGate {
    pub fn new() -> Self {
        Self::with_resource(())
    }
}

impl<R> ReentrantGate<R> {
    /// A gate protecting `resource`.
    pub fn with_resource(resource: R) -> Self {
        Self {
            core: GateCore::new(),
            token_enters: OnceLock::new(),
            resource,
        }
    }

    pub fn into_resource(self) -> R {
        self.resource
    }

    pub fn status(&self) -> GateStatus {
        self.core.status()
    }

    /// Number of unmatched completed close/bar_entry calls
    pub fn close_count(&self) -> u32 {
        self.core.close_count()
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.core.snapshot()
    }

    /// Enter on behalf of an explicit contender.
    pub fn enter_as<'a>(
        &self,
        contender: impl Into<ContenderRef<'a>>,
        timeout: Timeout,
    ) -> Result<bool, GateError> {
        let mut contender = contender.into();
        self.enter_internal(Holder::Contender(&mut contender), timeout)
    }

    pub fn exit_as<'a>(&self, contender: impl Into<ContenderRef<'a>>) -> Result<(), GateError> {
        let mut contender = contender.into();
        self.exit_internal(Holder::Contender(&mut contender))
    }

    pub fn close_as<'a>(
        &self,
        contender: impl Into<ContenderRef<'a>>,
        timeout: Timeout,
    ) -> Result<bool, GateError> {
        let contender = contender.into();
        let enter_this = self.count_of(ContenderView::from(&contender)).min(1);
        self.core.close(contender.id(), enter_this, timeout)
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

    /// True if the gate is closed and `contender` is the closer.
    pub fn is_closed_by<'a>(&self, contender: impl Into<ContenderView<'a>>) -> bool {
        self.core.is_closed_by(contender.into().id())
    }

    /// True if `contender` has entered and not yet exited.
    pub fn is_entered_by<'a>(&self, contender: impl Into<ContenderView<'a>>) -> bool {
        self.count_of(contender.into()) > 0
    }

    fn token_enters(&self) -> &DashMap<ContenderId, u64> {
        self.token_enters.get_or_init(DashMap::new)
    }

    fn count_of(&self, contender: ContenderView<'_>) -> u64 {
        match contender {
            ContenderView::Lite(lite) => lite.counts().get(self.core.id()),
            ContenderView::Token(token) => self
                .token_enters
                .get()
                .and_then(|map| map.get(&token.id()).map(|count| *count))
                .unwrap_or(0),
        }
    }

    fn thread_count(&self) -> u64 {
        let gate = self.core.id();
        with_thread_enters(|counts| counts.get(gate))
    }

    fn holder_id(holder: &Holder<'_, '_>) -> ContenderId {
        match holder {
            Holder::Thread => ContenderId::current_thread(),
            Holder::Contender(contender) => contender.id(),
        }
    }

    fn increment(&self, holder: &mut Holder<'_, '_>) -> u64 {
        let gate = self.core.id();
        match holder {
            Holder::Thread => with_thread_enters(|counts| counts.increment(gate)),
            Holder::Contender(ContenderRef::Lite(lite)) => lite.counts_mut().increment(gate),
            Holder::Contender(ContenderRef::Token(token)) => {
                let mut count = self.token_enters().entry(token.id()).or_insert(0);
                *count += 1;
                *count
            }
        }
    }

    fn decrement(&self, holder: &mut Holder<'_, '_>) -> Option<u64> {
        let gate = self.core.id();
        match holder {
            Holder::Thread => with_thread_enters(|counts| counts.decrement(gate)),
            Holder::Contender(ContenderRef::Lite(lite)) => lite.counts_mut().decrement(gate),
            Holder::Contender(ContenderRef::Token(token)) => {
                // the token is borrowed mutably, so nobody else touches its entry
                match self.token_enters().entry(token.id()) {
                    Entry::Occupied(mut entry) => {
                        let remaining = *entry.get() - 1;
                        if remaining == 0 {
                            entry.remove();
                        } else {
                            *entry.get_mut() = remaining;
                        }
                        Some(remaining)
                    }
                    Entry::Vacant(_) => None,
                }
            }
        }
    }

    fn enter_internal(&self, mut holder: Holder<'_, '_>, timeout: Timeout) -> Result<bool, GateError> {
        if self.increment(&mut holder) > 1 {
            // already inside; only our own count changes
            return Ok(true);
        }

        let result = if self.core.is_closer(Self::holder_id(&holder)) {
            // closing or closed by us, so we are always admitted
            self.core.enter_as_closer().map(|()| true)
        } else {
            self.core.enter_wait(timeout)
        };

        if !matches!(result, Ok(true)) {
            self.decrement(&mut holder);
        }
        result
    }

    fn exit_internal(&self, mut holder: Holder<'_, '_>) -> Result<(), GateError> {
        match self.decrement(&mut holder) {
            Some(0) => self.core.release_entry(),
            Some(_) => Ok(()),
            None => {
                let snapshot = self.core.snapshot();
                tracing::warn!(
                    contender = %Self::holder_id(&holder),
                    gate = %snapshot,
                    "exit without a matching enter"
                );
                Err(GateError::NotEntered(snapshot))
            }
        }
    }
}

impl Default for ReentrantGate {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync> Gate for ReentrantGate<R> {
    type Resource = R;

    fn resource(&self) -> &R {
        &self.resource
    }

    fn enter(&self, timeout: Timeout) -> Result<bool, GateError> {
        let gate = self.core.id();
        if with_thread_enters(|counts| counts.increment(gate)) > 1 {
            return Ok(true);
        }
        if self.core.try_enter_open() {
            return Ok(true);
        }

        // undo and take the slow path
        with_thread_enters(|counts| counts.decrement(gate));
        self.enter_internal(Holder::Thread, timeout)
    }

    fn exit(&self) -> Result<(), GateError> {
        self.exit_internal(Holder::Thread)
    }

    fn close(&self, timeout: Timeout) -> Result<bool, GateError> {
        let enter_this = self.thread_count().min(1);
        self.core
            .close(ContenderId::current_thread(), enter_this, timeout)
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

    fn is_entered_by_current_thread(&self) -> bool {
        self.thread_count() > 0
    }

    fn active_count(&self) -> u64 {
        self.core.active_count()
    }
}

impl<R> fmt::Display for ReentrantGate<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReentrantGate::{}", self.core.snapshot())
    }
}

#[cfg(test)]
#[path = "reentrant_tests.rs"]
mod tests;
