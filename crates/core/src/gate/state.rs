// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Packed gate state machine shared by the gate implementations
//!
//! The status and active-entry count share one atomic word:
//!
//! ```text
//! bits  0-59  number of entered contenders
//! bits 60-61  GateStatus
//! bits 62-63  always zero
//! ```
//!
//! Entering and exiting are CAS operations on that word. The mutex and
//! condvar are only used on the rare close/open/notify paths.

use super::contender::{ContenderId, GateId};
use super::{GateSnapshot, GateStatus, Timeout};
use crate::clock::SafeClock;
use crate::error::GateError;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

const STATUS_OFFSET: u32 = 60;

pub(crate) const ACTIVE_COUNT_MASK: u64 = u64::MAX >> (64 - STATUS_OFFSET);

const EMPTY_GATE_OPEN: u64 = (GateStatus::Open as u64) << STATUS_OFFSET;

/// No more entries can be counted at or above this state
const FULL_GATE_OPEN: u64 = EMPTY_GATE_OPEN | ACTIVE_COUNT_MASK;

const EMPTY_GATE_CLOSING: u64 = (GateStatus::Closing as u64) << STATUS_OFFSET;

const EMPTY_GATE_CLOSED: u64 = (GateStatus::Closed as u64) << STATUS_OFFSET;

fn status_of(state: u64) -> GateStatus {
    match state >> STATUS_OFFSET {
        0 => GateStatus::Open,
        1 => GateStatus::Closing,
        2 => GateStatus::Closed,
        _ => GateStatus::Destroyed,
    }
}

#[derive(Debug)]
pub(crate) struct GateCore {
    id: GateId,
    state: AtomicU64,
    lock: Mutex<()>,
    opened: Condvar,
    /// Raw id of the closer, zero when none; written only under `lock`
    closer: AtomicU64,
    /// Unmatched close/bar_entry calls; touched only by the closer
    close_count: AtomicU32,
    clock: &'static SafeClock,
}

impl GateCore {
    pub(crate) fn new() -> Self {
        Self {
            id: GateId::next(),
            state: AtomicU64::new(EMPTY_GATE_OPEN),
            lock: Mutex::new(()),
            opened: Condvar::new(),
            closer: AtomicU64::new(0),
            close_count: AtomicU32::new(0),
            clock: SafeClock::global(),
        }
    }

    pub(crate) fn id(&self) -> GateId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn status(&self) -> GateStatus {
        status_of(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn active_count(&self) -> u64 {
        self.state.load(Ordering::Acquire) & ACTIVE_COUNT_MASK
    }

    pub(crate) fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::Acquire)
    }

    pub(crate) fn closer(&self) -> Option<ContenderId> {
        ContenderId::from_raw(self.closer.load(Ordering::Acquire))
    }

    fn set_closer(&self, closer: Option<ContenderId>) {
        self.closer
            .store(closer.map_or(0, ContenderId::as_raw), Ordering::Release);
    }

    pub(crate) fn is_closer(&self, contender: ContenderId) -> bool {
        self.closer() == Some(contender)
    }

    pub(crate) fn is_closed_by(&self, contender: ContenderId) -> bool {
        self.is_closer(contender) && self.status() == GateStatus::Closed
    }

    /// Lock-free view of the gate; safe to call while holding the internal lock.
    pub(crate) fn snapshot(&self) -> GateSnapshot {
        let state = self.state.load(Ordering::Acquire);
        GateSnapshot {
            status: status_of(state),
            active_count: state & ACTIVE_COUNT_MASK,
            close_count: self.close_count(),
            closer: self.closer(),
        }
    }

    /// Common path: count one entry into an open gate that is not full.
    pub(crate) fn try_enter_open(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        while current < FULL_GATE_OPEN {
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Count an entry by the closer, which is admitted in any status.
    pub(crate) fn enter_as_closer(&self) -> Result<(), GateError> {
        if self.state.load(Ordering::Acquire) & ACTIVE_COUNT_MASK == ACTIVE_COUNT_MASK {
            return Err(GateError::Full(self.snapshot()));
        }
        // only exits can race with us now, so a blind increment is safe
        self.state.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Count an entry, waiting for the gate to open if it is closing or closed.
    pub(crate) fn enter_wait(&self, mut timeout: Timeout) -> Result<bool, GateError> {
        loop {
            let current = self.state.load(Ordering::Acquire);
            match status_of(current) {
                GateStatus::Open => {
                    if current & ACTIVE_COUNT_MASK == ACTIVE_COUNT_MASK {
                        return Err(GateError::Full(self.snapshot()));
                    }
                    if self
                        .state
                        .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return Ok(true);
                    }
                    // raced with another enter or a close; retry
                }
                GateStatus::Closing | GateStatus::Closed => {
                    let guard = self.lock();
                    if matches!(self.status(), GateStatus::Closing | GateStatus::Closed) {
                        let (_guard, remaining) = self.wait(guard, timeout);
                        timeout = remaining;
                        if timeout.is_expired() {
                            tracing::debug!(gate = %self.snapshot(), "enter timed out");
                            return Ok(false);
                        }
                    }
                }
                GateStatus::Destroyed => return Err(GateError::Destroyed(self.snapshot())),
            }
        }
    }

    /// Remove one counted entry, waking the closer if this was the last one.
    pub(crate) fn release_entry(&self) -> Result<(), GateError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & ACTIVE_COUNT_MASK == 0 {
                return Err(GateError::NotEntered(self.snapshot()));
            }
            match self.state.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current - 1 == EMPTY_GATE_CLOSING {
            // last one out while closing; the closer is waiting on the condvar
            let _guard = self.lock();
            self.opened.notify_all();
        }
        Ok(())
    }

    /// Close the gate for `me`, whose own contribution to the active count
    /// is `enter_this` (zero or one).
    pub(crate) fn close(
        &self,
        me: ContenderId,
        enter_this: u64,
        mut timeout: Timeout,
    ) -> Result<bool, GateError> {
        if self.is_closed_by(me) {
            self.close_count.fetch_add(1, Ordering::AcqRel);
            return Ok(true);
        }

        let mut required = EMPTY_GATE_OPEN | enter_this;
        let closed = EMPTY_GATE_CLOSED | enter_this;
        let mut reenter = false;
        let mut reopen = false;

        let mut guard = self.lock();
        if self.is_closer(me) {
            // already closing via bar_entry
            required = EMPTY_GATE_CLOSING;
            if enter_this > 0 {
                // drop our own entry so the last exiter sees EMPTY_GATE_CLOSING
                reenter = true;
                self.state.fetch_sub(enter_this, Ordering::AcqRel);
            }
        }

        let result = loop {
            if self
                .state
                .compare_exchange(required, closed, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.close_count.fetch_add(1, Ordering::AcqRel);
                self.set_closer(Some(me));
                reenter = false;
                reopen = false;
                tracing::trace!(gate = %self.snapshot(), "closed");
                break Ok(true);
            }

            if self.closer().is_none() {
                if self.update_status(GateStatus::Closing) == GateStatus::Destroyed {
                    self.update_status(GateStatus::Destroyed);
                    break Err(GateError::Destroyed(self.snapshot()));
                }
                self.set_closer(Some(me));
                required = EMPTY_GATE_CLOSING;
                reopen = true;
                if enter_this > 0 {
                    reenter = true;
                    self.state.fetch_sub(enter_this, Ordering::AcqRel);
                }
                // exiters only notify while CLOSING, so retest before waiting
                continue;
            }

            let (reacquired, remaining) = self.wait(guard, timeout);
            guard = reacquired;
            timeout = remaining;
            if timeout.is_expired() {
                tracing::debug!(gate = %self.snapshot(), "close timed out");
                break Ok(false);
            }
        };

        if reenter {
            self.state.fetch_add(enter_this, Ordering::AcqRel);
        }
        if reopen {
            self.set_closer(None);
            self.update_status(GateStatus::Open);
            self.opened.notify_all();
        }
        drop(guard);
        result
    }

    /// Claim the closer role without waiting for entered contenders.
    pub(crate) fn bar_entry(&self, me: ContenderId, mut timeout: Timeout) -> Result<bool, GateError> {
        if self.is_closer(me) {
            self.close_count.fetch_add(1, Ordering::AcqRel);
            return Ok(true);
        }

        let mut guard = self.lock();
        loop {
            if self.closer().is_none() {
                if self.update_status(GateStatus::Closing) == GateStatus::Destroyed {
                    self.update_status(GateStatus::Destroyed);
                    return Err(GateError::Destroyed(self.snapshot()));
                }
                self.set_closer(Some(me));
                self.close_count.store(1, Ordering::Release);
                tracing::trace!(gate = %self.snapshot(), "entry barred");
                return Ok(true);
            }

            let (reacquired, remaining) = self.wait(guard, timeout);
            guard = reacquired;
            timeout = remaining;
            if timeout.is_expired() {
                tracing::debug!(gate = %self.snapshot(), "bar entry timed out");
                return Ok(false);
            }
        }
    }

    pub(crate) fn open(&self, me: ContenderId) -> Result<(), GateError> {
        if self.is_closer(me) {
            let count = self.close_count();
            if count >= 1 {
                self.close_count.store(count - 1, Ordering::Release);
                if count == 1 {
                    let _guard = self.lock();
                    self.update_status(GateStatus::Open);
                    self.set_closer(None);
                    self.opened.notify_all();
                    tracing::trace!(gate = %self.snapshot(), "opened");
                }
                return Ok(());
            }
        }

        let snapshot = self.snapshot();
        tracing::warn!(contender = %me, gate = %snapshot, "open by a contender that did not close");
        Err(GateError::NotCloser {
            contender: me,
            snapshot,
        })
    }

    pub(crate) fn destroy(&self, me: ContenderId) -> Result<(), GateError> {
        let _guard = self.lock();
        match self.status() {
            GateStatus::Closed => {
                if !self.is_closer(me) {
                    let snapshot = self.snapshot();
                    tracing::warn!(contender = %me, gate = %snapshot, "destroy by a contender that did not close");
                    return Err(GateError::NotCloser {
                        contender: me,
                        snapshot,
                    });
                }
                self.update_status(GateStatus::Destroyed);
                self.set_closer(None);
                self.opened.notify_all();
                tracing::trace!(gate = %self.snapshot(), "destroyed");
                Ok(())
            }
            GateStatus::Destroyed => Ok(()),
            GateStatus::Open | GateStatus::Closing => {
                Err(GateError::NotClosed(self.snapshot()))
            }
        }
    }

    /// Replace the status, keeping the active count. Returns the old status.
    fn update_status(&self, status: GateStatus) -> GateStatus {
        let bits = (status as u64) << STATUS_OFFSET;
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = bits | (current & ACTIVE_COUNT_MASK);
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(previous) => return status_of(previous),
                Err(actual) => current = actual,
            }
        }
    }

    /// Wait for a notification, returning the remaining budget. Elapsed time
    /// is measured on the safe clock, so the budget never grows.
    fn wait<'g>(&self, guard: MutexGuard<'g, ()>, timeout: Timeout) -> (MutexGuard<'g, ()>, Timeout) {
        match timeout {
            Timeout::Millis(0) => (guard, timeout),
            Timeout::Infinite => {
                let guard = self.opened.wait(guard).unwrap_or_else(|e| e.into_inner());
                (guard, timeout)
            }
            Timeout::Millis(millis) => {
                let start = self.clock.now();
                let (guard, _) = self
                    .opened
                    .wait_timeout(guard, Duration::from_millis(millis))
                    .unwrap_or_else(|e| e.into_inner());
                let elapsed = u64::try_from(self.clock.now() - start).unwrap_or(0);
                (guard, Timeout::Millis(millis.saturating_sub(elapsed)))
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
