// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pile configuration

use concord_core::config::parse_u64;
use concord_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Environment variable overriding the unfairness variance
pub const UNFAIRNESS_VARIANCE_ENV: &str = "CONCORD_PILE_UNFAIRNESS_VARIANCE";

/// Concurrent pile configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PileConfig {
    /// How many positions an element may trail the newest before it is
    /// queued by age instead of arrival
    pub unfairness_variance: u64,
}

impl PileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unfairness_variance(mut self, variance: u64) -> Self {
        self.unfairness_variance = variance;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(UNFAIRNESS_VARIANCE_ENV) {
            config.unfairness_variance = parse_u64(UNFAIRNESS_VARIANCE_ENV, &value)?;
        }
        Ok(config)
    }
}

/// Scales with the number of threads likely to be polling at once.
pub fn default_unfairness_variance() -> u64 {
    let parallelism = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    u64::try_from(parallelism).unwrap_or(u64::MAX).saturating_mul(2)
}

impl Default for PileConfig {
    fn default() -> Self {
        Self {
            unfairness_variance: default_unfairness_variance(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
