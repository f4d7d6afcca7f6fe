// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Association keys for pile elements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// What a pile element contends with.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Association<K> {
    /// Contends with nothing
    None,
    /// Contends with every other element carrying the same key
    Key(K),
    /// Contends with every associated element
    All,
}

impl<K> Association<K> {
    /// The reserved marker associated with everything
    pub const ALL: Association<K> = Association::All;

    pub fn is_none(&self) -> bool {
        matches!(self, Association::None)
    }

    pub fn key(&self) -> Option<&K> {
        match self {
            Association::Key(key) => Some(key),
            Association::None | Association::All => None,
        }
    }
}

impl<K: fmt::Debug> fmt::Display for Association<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Association::None => f.write_str("none"),
            Association::Key(key) => write!(f, "{key:?}"),
            Association::All => f.write_str("ALL"),
        }
    }
}

impl<K> From<Option<K>> for Association<K> {
    fn from(key: Option<K>) -> Self {
        key.map_or(Association::None, Association::Key)
    }
}

/// A value that may carry an association.
pub trait Associated {
    type Key: Eq + Hash + Clone + Send + Sync + fmt::Debug;

    fn association(&self) -> Association<Self::Key>;
}

/// A value paired with its association.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyed<K, V> {
    association: Association<K>,
    value: V,
}

impl<K, V> Keyed<K, V> {
    pub fn new(association: Association<K>, value: V) -> Self {
        Self { association, value }
    }

    pub fn unassociated(value: V) -> Self {
        Self::new(Association::None, value)
    }

    pub fn with_key(key: K, value: V) -> Self {
        Self::new(Association::Key(key), value)
    }

    pub fn all(value: V) -> Self {
        Self::new(Association::All, value)
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }
}

impl<K, V> Associated for Keyed<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug,
{
    type Key = K;

    fn association(&self) -> Association<K> {
        self.association.clone()
    }
}

#[cfg(test)]
#[path = "association_tests.rs"]
mod tests;
