// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent association pile
//!
//! Available elements sit in a lock-free FIFO, or in a position-ordered
//! aged set once they trail the newest position by more than the
//! unfairness variance. `poll` alternates which of the two it drains first.
//!
//! Per-key exclusion is tracked in a concurrent registry. A key that is
//! owned but uncontended is a bare [`KeyState::Locked`] marker; a queue is
//! only allocated once a second element for the key arrives.
//!
//! ALL elements are coordinated through a non-reentrant gate. Associated
//! adds and releases enter it; ALL adds and releases close it. While an
//! ALL is pending, newly added associated elements are parked behind it in
//! position order, and the ALL itself surfaces once every owned key has
//! been released.

use crate::association::{Associated, Association};
use crate::config::PileConfig;
use crate::error::PileError;
use crate::AssociationPile;
use concord_core::{Gate, NonReentrantGate};
use crossbeam_queue::SegQueue;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct Node<T> {
    value: T,
    position: u64,
}

/// Ownership of one association key
#[derive(Debug)]
enum KeyState<T> {
    /// One element is available or polled; nothing is waiting
    Locked,
    /// One element is available or polled; these wait behind it, oldest first
    Deferred(VecDeque<Node<T>>),
}

/// An element held back until the pending ALL is released
#[derive(Debug)]
enum Parked<T: Associated> {
    /// A later ALL, which becomes the next pending one
    All(Node<T>),
    /// The next element of an owned key
    Owner(Node<T>),
    /// A newly added associated element not yet registered
    Fresh(Node<T>, T::Key),
}

#[derive(Debug)]
struct AllState<T: Associated> {
    /// The pending ALL while associated elements are still outstanding
    waiting: Option<Node<T>>,
    parked: BTreeMap<u64, Parked<T>>,
}

#[derive(Debug)]
struct Aged<T> {
    nodes: BTreeMap<(u64, u64), Node<T>>,
    /// Tie-breaker; unassociated positions are not unique
    sequence: u64,
}

/// Association pile built for many concurrent pollers.
#[derive(Debug)]
pub struct ConcurrentAssociationPile<T: Associated> {
    config: PileConfig,
    /// Last position handed out
    position: AtomicU64,
    size: AtomicUsize,
    polls: AtomicU64,
    available: SegQueue<Node<T>>,
    aged: Mutex<Aged<T>>,
    aged_count: AtomicUsize,
    registry: DashMap<T::Key, KeyState<T>>,
    /// Keys with an element available or polled and unreleased
    associated: AtomicUsize,
    all_gate: NonReentrantGate,
    /// Position of the pending ALL, zero when none; changed only while `all_gate` is closed
    pending_all: AtomicU64,
    all_state: Mutex<AllState<T>>,
}

impl<T: Associated> ConcurrentAssociationPile<T> {
    pub fn new() -> Self {
        Self::with_config(PileConfig::default())
    }

    pub fn with_config(config: PileConfig) -> Self {
        Self {
            config,
            position: AtomicU64::new(0),
            size: AtomicUsize::new(0),
            polls: AtomicU64::new(0),
            available: SegQueue::new(),
            aged: Mutex::new(Aged {
                nodes: BTreeMap::new(),
                sequence: 0,
            }),
            aged_count: AtomicUsize::new(0),
            registry: DashMap::new(),
            associated: AtomicUsize::new(0),
            all_gate: NonReentrantGate::new(),
            pending_all: AtomicU64::new(0),
            all_state: Mutex::new(AllState {
                waiting: None,
                parked: BTreeMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &PileConfig {
        &self.config
    }

    fn all_state(&self) -> MutexGuard<'_, AllState<T>> {
        self.all_state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_position(&self) -> u64 {
        self.position.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn make_available(&self, node: Node<T>) {
        let newest = self.position.load(Ordering::Acquire);
        if newest.saturating_sub(node.position) > self.config.unfairness_variance {
            let mut aged = self.aged.lock().unwrap_or_else(|e| e.into_inner());
            aged.sequence += 1;
            let key = (node.position, aged.sequence);
            aged.nodes.insert(key, node);
            self.aged_count.fetch_add(1, Ordering::AcqRel);
        } else {
            self.available.push(node);
        }
    }

    fn poll_aged(&self) -> Option<Node<T>> {
        if self.aged_count.load(Ordering::Acquire) == 0 {
            return None;
        }
        let mut aged = self.aged.lock().unwrap_or_else(|e| e.into_inner());
        let (_, node) = aged.nodes.pop_first()?;
        self.aged_count.fetch_sub(1, Ordering::AcqRel);
        Some(node)
    }

    fn add_associated(&self, value: T, key: T::Key) -> Result<(), PileError> {
        let _entered = self.all_gate.enter_scoped()?;
        let node = Node {
            value,
            position: self.next_position(),
        };
        if self.pending_all.load(Ordering::Acquire) != 0 {
            self.all_state()
                .parked
                .insert(node.position, Parked::Fresh(node, key));
            return Ok(());
        }
        self.register(node, key);
        Ok(())
    }

    /// Take ownership of `key` for `node`, or queue it behind the owner.
    fn register(&self, node: Node<T>, key: T::Key) {
        let node = match self.registry.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(KeyState::Locked);
                node
            }
            Entry::Occupied(mut entry) => {
                if let KeyState::Deferred(queue) = entry.get_mut() {
                    queue.push_back(node);
                } else {
                    // second element for an owned key: promote the marker to a queue
                    entry.insert(KeyState::Deferred(VecDeque::from([node])));
                }
                return;
            }
        };
        self.associated.fetch_add(1, Ordering::AcqRel);
        self.make_available(node);
    }

    fn add_all(&self, value: T) -> Result<(), PileError> {
        let _closed = self.all_gate.close_scoped()?;
        let node = Node {
            value,
            position: self.next_position(),
        };
        if self.pending_all.load(Ordering::Acquire) != 0 {
            self.all_state()
                .parked
                .insert(node.position, Parked::All(node));
            return Ok(());
        }
        self.install_all(node);
        Ok(())
    }

    /// Make `node` the pending ALL. Requires the gate closed.
    fn install_all(&self, node: Node<T>) {
        self.pending_all.store(node.position, Ordering::Release);
        if self.associated.load(Ordering::Acquire) == 0 {
            tracing::trace!(position = node.position, "ALL available");
            self.make_available(node);
        } else {
            tracing::trace!(position = node.position, "ALL waiting for associated releases");
            self.all_state().waiting = Some(node);
        }
    }

    fn release_associated(&self, key: &T::Key) -> Result<(), PileError> {
        let _entered = self.all_gate.enter_scoped()?;
        let next = match self.registry.entry(key.clone()) {
            Entry::Vacant(_) => {
                tracing::warn!(?key, "release of a key that is not outstanding");
                return Err(PileError::NotPending {
                    association: format!("{key:?}"),
                });
            }
            Entry::Occupied(mut entry) => {
                let (next, drained) = match entry.get_mut() {
                    KeyState::Locked => (None, false),
                    KeyState::Deferred(queue) => {
                        let next = queue.pop_front();
                        let drained = queue.is_empty();
                        (next, drained)
                    }
                };
                if next.is_none() {
                    entry.remove();
                } else if drained {
                    entry.insert(KeyState::Locked);
                }
                next
            }
        };

        match next {
            None => self.release_in_flight(),
            Some(node) => {
                let pending = self.pending_all.load(Ordering::Acquire);
                if pending != 0 && node.position > pending {
                    // Successors are queued inside the gate, so one normally
                    // predates any ALL installed after it. If it postdates the
                    // ALL, the key stays owned and the element waits behind it.
                    self.all_state()
                        .parked
                        .insert(node.position, Parked::Owner(node));
                    self.release_in_flight();
                } else {
                    self.make_available(node);
                }
            }
        }
        Ok(())
    }

    /// One fewer associated element in flight; surface a waiting ALL if none remain.
    fn release_in_flight(&self) {
        if self.associated.fetch_sub(1, Ordering::AcqRel) == 1
            && self.pending_all.load(Ordering::Acquire) != 0
        {
            let waiting = self.all_state().waiting.take();
            if let Some(node) = waiting {
                tracing::trace!(position = node.position, "ALL available");
                self.make_available(node);
            }
        }
    }

    fn release_all(&self) -> Result<(), PileError> {
        let _closed = self.all_gate.close_scoped()?;

        // everything parked up to and including the next ALL, in position order
        let drained = {
            let mut state = self.all_state();
            if self.pending_all.load(Ordering::Acquire) == 0 || state.waiting.is_some() {
                drop(state);
                tracing::warn!("release of ALL which is not outstanding");
                return Err(PileError::NotPending {
                    association: Association::<T::Key>::All.to_string(),
                });
            }

            let mut drained = Vec::new();
            while let Some((_, parked)) = state.parked.pop_first() {
                let is_all = matches!(parked, Parked::All(_));
                drained.push(parked);
                if is_all {
                    break;
                }
            }
            drained
        };

        tracing::trace!(drained = drained.len(), "ALL released");
        let mut installed = false;
        for parked in drained {
            match parked {
                Parked::Owner(node) => {
                    self.associated.fetch_add(1, Ordering::AcqRel);
                    self.make_available(node);
                }
                Parked::Fresh(node, key) => self.register(node, key),
                Parked::All(node) => {
                    self.install_all(node);
                    installed = true;
                }
            }
        }
        if !installed {
            self.pending_all.store(0, Ordering::Release);
        }
        Ok(())
    }
}

impl<T: Associated> Default for ConcurrentAssociationPile<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssociationPile<T> for ConcurrentAssociationPile<T>
where
    T: Associated + Send + Sync,
{
    fn add(&self, value: T) -> Result<bool, PileError> {
        self.size.fetch_add(1, Ordering::AcqRel);
        let result = match value.association() {
            Association::None => {
                // unassociated elements share a position rather than contend on it
                let position = self.position.load(Ordering::Acquire);
                self.make_available(Node { value, position });
                Ok(())
            }
            Association::Key(key) => self.add_associated(value, key),
            Association::All => self.add_all(value),
        };
        if result.is_err() {
            self.size.fetch_sub(1, Ordering::AcqRel);
        }
        result.map(|()| true)
    }

    fn poll(&self) -> Option<T> {
        let node = if self.polls.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            self.available.pop().or_else(|| self.poll_aged())
        } else {
            self.poll_aged().or_else(|| self.available.pop())
        }?;
        self.size.fetch_sub(1, Ordering::AcqRel);
        Some(node.value)
    }

    fn release(&self, value: &T) -> Result<(), PileError> {
        match value.association() {
            Association::None => Ok(()),
            Association::Key(key) => self.release_associated(&key),
            Association::All => self.release_all(),
        }
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn is_available(&self) -> bool {
        !self.available.is_empty() || self.aged_count.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
#[path = "concurrent_tests.rs"]
mod tests;
