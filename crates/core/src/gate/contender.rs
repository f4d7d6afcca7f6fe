// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contender identities and enter-count bookkeeping
//!
//! A contender is whoever holds entries or the closer role on a gate: the
//! calling thread, or an explicit token that may move between threads.
//! Counts for the calling thread live in a thread-local; counts for a
//! [`LiteContender`] live inline in the contender; counts for a plain
//! [`Token`] live in a side table inside the gate.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTENDER: AtomicU64 = AtomicU64::new(1);
static NEXT_GATE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_CONTENDER: ContenderId = ContenderId::next();
    static THREAD_ENTERS: RefCell<EnterCounts> = RefCell::new(EnterCounts::default());
}

/// Identity of a contender. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContenderId(u64);

impl ContenderId {
    fn next() -> Self {
        Self(NEXT_CONTENDER.fetch_add(1, Ordering::Relaxed))
    }

    /// Identity of the calling thread
    pub fn current_thread() -> Self {
        THREAD_CONTENDER.with(|id| *id)
    }

    pub(crate) fn as_raw(self) -> u64 {
        self.0
    }

    /// Zero is reserved for "no contender"
    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }
}

impl fmt::Display for ContenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contender-{}", self.0)
    }
}

/// Identity of a gate, used to key per-contender counts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GateId(u64);

impl GateId {
    pub(crate) fn next() -> Self {
        Self(NEXT_GATE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Per-gate enter counts. The first gate used is stored inline; others
/// spill into a map. Zero counts are never stored.
#[derive(Debug, Default)]
pub(crate) struct EnterCounts {
    primary: Option<(GateId, u64)>,
    others: HashMap<GateId, u64>,
}

impl EnterCounts {
    pub(crate) fn get(&self, gate: GateId) -> u64 {
        match self.primary {
            Some((g, count)) if g == gate => count,
            _ => self.others.get(&gate).copied().unwrap_or(0),
        }
    }

    pub(crate) fn increment(&mut self, gate: GateId) -> u64 {
        if let Some((g, count)) = &mut self.primary {
            if *g == gate {
                *count += 1;
                return *count;
            }
        }

        if self.primary.is_none() && !self.others.contains_key(&gate) {
            self.primary = Some((gate, 1));
            return 1;
        }

        let count = self.others.entry(gate).or_insert(0);
        *count += 1;
        *count
    }

    /// Returns the new count, or `None` if the gate was not entered.
    pub(crate) fn decrement(&mut self, gate: GateId) -> Option<u64> {
        if let Some((g, count)) = &mut self.primary {
            if *g == gate {
                *count -= 1;
                let remaining = *count;
                if remaining == 0 {
                    self.primary = None;
                }
                return Some(remaining);
            }
        }

        let count = self.others.get_mut(&gate)?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.others.remove(&gate);
        }
        Some(remaining)
    }
}

/// Run `f` against the calling thread's enter counts.
pub(crate) fn with_thread_enters<R>(f: impl FnOnce(&mut EnterCounts) -> R) -> R {
    THREAD_ENTERS.with(|counts| f(&mut counts.borrow_mut()))
}

/// An explicit, non-thread contender whose counts are kept by each gate it uses.
///
/// Identity is by token, not by value: two tokens are always distinct
/// contenders. Prefer [`LiteContender`] unless the contender is spread over
/// many gates.
#[derive(Debug)]
pub struct Token {
    id: ContenderId,
}

impl Token {
    pub fn new() -> Self {
        Self {
            id: ContenderId::next(),
        }
    }

    pub fn id(&self) -> ContenderId {
        self.id
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

/// An explicit contender that carries its own counts, so the common
/// single-gate case allocates nothing inside the gate.
#[derive(Debug)]
pub struct LiteContender {
    id: ContenderId,
    counts: EnterCounts,
}

impl LiteContender {
    pub fn new() -> Self {
        Self {
            id: ContenderId::next(),
            counts: EnterCounts::default(),
        }
    }

    pub fn id(&self) -> ContenderId {
        self.id
    }

    pub(crate) fn counts(&self) -> &EnterCounts {
        &self.counts
    }

    pub(crate) fn counts_mut(&mut self) -> &mut EnterCounts {
        &mut self.counts
    }
}

impl Default for LiteContender {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrowed explicit contender. Holding it mutably serializes the
/// contender's gate operations.
#[derive(Debug)]
pub enum ContenderRef<'a> {
    Token(&'a mut Token),
    Lite(&'a mut LiteContender),
}

impl ContenderRef<'_> {
    pub fn id(&self) -> ContenderId {
        match self {
            ContenderRef::Token(token) => token.id(),
            ContenderRef::Lite(lite) => lite.id(),
        }
    }
}

impl<'a> From<&'a mut Token> for ContenderRef<'a> {
    fn from(token: &'a mut Token) -> Self {
        ContenderRef::Token(token)
    }
}

impl<'a> From<&'a mut LiteContender> for ContenderRef<'a> {
    fn from(lite: &'a mut LiteContender) -> Self {
        ContenderRef::Lite(lite)
    }
}

/// A shared borrow of an explicit contender, for read-only queries.
#[derive(Clone, Copy, Debug)]
pub enum ContenderView<'a> {
    Token(&'a Token),
    Lite(&'a LiteContender),
}

impl ContenderView<'_> {
    pub fn id(&self) -> ContenderId {
        match self {
            ContenderView::Token(token) => token.id(),
            ContenderView::Lite(lite) => lite.id(),
        }
    }
}

impl<'a> From<&'a Token> for ContenderView<'a> {
    fn from(token: &'a Token) -> Self {
        ContenderView::Token(token)
    }
}

impl<'a> From<&'a LiteContender> for ContenderView<'a> {
    fn from(lite: &'a LiteContender) -> Self {
        ContenderView::Lite(lite)
    }
}

impl<'a> From<&'a mut Token> for ContenderView<'a> {
    fn from(token: &'a mut Token) -> Self {
        ContenderView::Token(token)
    }
}

impl<'a> From<&'a mut LiteContender> for ContenderView<'a> {
    fn from(lite: &'a mut LiteContender) -> Self {
        ContenderView::Lite(lite)
    }
}

impl<'a> From<&'a ContenderRef<'_>> for ContenderView<'a> {
    fn from(contender: &'a ContenderRef<'_>) -> Self {
        match contender {
            ContenderRef::Token(token) => ContenderView::Token(token),
            ContenderRef::Lite(lite) => ContenderView::Lite(lite),
        }
    }
}

#[cfg(test)]
#[path = "contender_tests.rs"]
mod tests;
