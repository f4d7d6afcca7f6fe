// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! concord-pile: association piles
//!
//! A pile hands work items to many polling threads while guaranteeing that
//! items sharing an association key are never in flight together. An item
//! associated with [`Association::ALL`] excludes every associated item.
//!
//! Ordering is FIFO within a key only.

mod association;
mod concurrent;
mod config;
mod error;
mod simple;

pub use association::{Associated, Association, Keyed};
pub use concurrent::ConcurrentAssociationPile;
pub use config::{default_unfairness_variance, PileConfig, UNFAIRNESS_VARIANCE_ENV};
pub use error::PileError;
pub use simple::SimpleAssociationPile;

/// A queue-like collection enforcing per-association exclusion.
pub trait AssociationPile<T: Associated>: Send + Sync {
    /// Add a value. Always accepted.
    fn add(&self, value: T) -> Result<bool, PileError>;

    /// Remove the oldest uncontended value, or `None` if every value is
    /// contended or the pile is empty. Never blocks.
    fn poll(&self) -> Option<T>;

    /// Release a value returned by [`AssociationPile::poll`], letting the
    /// next value with the same association through. Call exactly once per
    /// polled value.
    fn release(&self, value: &T) -> Result<(), PileError>;

    /// Number of values added and not yet polled
    fn size(&self) -> usize;

    /// May be `true` when every value is contended, but never `false` while
    /// an uncontended value exists.
    fn is_available(&self) -> bool;
}
