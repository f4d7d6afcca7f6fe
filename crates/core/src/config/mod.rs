// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration modules
//!
//! Every config type deserializes with serde and can be overridden from the
//! environment through a `from_env` constructor.

mod clock;

pub use clock::{ClockConfig, DEFAULT_JITTER, JITTER_ENV};

use crate::error::ConfigError;
use std::time::Duration;

/// Parse a duration override. A bare integer is read as milliseconds,
/// anything else goes through humantime (`"25ms"`, `"1s"`).
pub fn parse_duration(name: &str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse an unsigned integer override.
pub fn parse_u64(name: &str, value: &str) -> Result<u64, ConfigError> {
    let value = value.trim();
    value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
