// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-lock association pile
//!
//! `poll` scans from the head and returns the first uncontended element.
//! Linear in the number of contended elements, but easy to reason about.

use crate::association::{Associated, Association};
use crate::error::PileError;
use crate::AssociationPile;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct Inner<T: Associated> {
    elements: VecDeque<T>,
    /// Keys with a polled, unreleased element
    locked: HashSet<T::Key>,
    /// An ALL element is polled and unreleased
    all_locked: bool,
}

#[derive(Debug)]
pub struct SimpleAssociationPile<T: Associated> {
    inner: Mutex<Inner<T>>,
}

impl<T: Associated> SimpleAssociationPile<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                elements: VecDeque::new(),
                locked: HashSet::new(),
                all_locked: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Associated> Default for SimpleAssociationPile<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Associated> Inner<T> {
    /// Index of the first uncontended element.
    fn first_uncontended(&self) -> Option<usize> {
        let mut seen_keys = HashSet::new();
        let mut seen_all = false;
        let mut seen_associated = false;

        for (index, element) in self.elements.iter().enumerate() {
            match element.association() {
                Association::None => return Some(index),
                Association::Key(key) => {
                    if !self.all_locked
                        && !seen_all
                        && !self.locked.contains(&key)
                        && !seen_keys.contains(&key)
                    {
                        return Some(index);
                    }
                    seen_keys.insert(key);
                    seen_associated = true;
                }
                Association::All => {
                    if !self.all_locked
                        && self.locked.is_empty()
                        && !seen_associated
                        && !seen_all
                    {
                        return Some(index);
                    }
                    seen_all = true;
                }
            }
        }
        None
    }
}

impl<T> AssociationPile<T> for SimpleAssociationPile<T>
where
    T: Associated + Send,
{
    fn add(&self, value: T) -> Result<bool, PileError> {
        self.lock().elements.push_back(value);
        Ok(true)
    }

    fn poll(&self) -> Option<T> {
        let mut inner = self.lock();
        let index = inner.first_uncontended()?;
        let value = inner.elements.remove(index)?;
        match value.association() {
            Association::None => {}
            Association::Key(key) => {
                inner.locked.insert(key);
            }
            Association::All => inner.all_locked = true,
        }
        Some(value)
    }

    fn release(&self, value: &T) -> Result<(), PileError> {
        let association = value.association();
        let mut inner = self.lock();
        let released = match &association {
            Association::None => true,
            Association::Key(key) => inner.locked.remove(key),
            Association::All => std::mem::replace(&mut inner.all_locked, false),
        };
        if released {
            return Ok(());
        }

        drop(inner);
        tracing::warn!(%association, "release of an association that is not outstanding");
        Err(PileError::NotPending {
            association: association.to_string(),
        })
    }

    fn size(&self) -> usize {
        self.lock().elements.len()
    }

    fn is_available(&self) -> bool {
        self.lock().first_uncontended().is_some()
    }
}

#[cfg(test)]
#[path = "simple_tests.rs"]
mod tests;
