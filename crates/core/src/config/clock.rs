// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safe clock configuration

use super::parse_duration;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the jitter threshold
pub const JITTER_ENV: &str = "CONCORD_CLOCK_JITTER";

/// Default jitter threshold
pub const DEFAULT_JITTER: Duration = Duration::from_millis(16);

/// Safe clock configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Backward fluctuations of the raw clock up to this size are ignored
    #[serde(with = "humantime_serde")]
    pub jitter: Duration,
}

impl ClockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(JITTER_ENV) {
            config.jitter = parse_duration(JITTER_ENV, &value)?;
        }
        Ok(config)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            jitter: DEFAULT_JITTER,
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
