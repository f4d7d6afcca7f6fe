// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for gates and configuration

use crate::gate::{ContenderId, GateSnapshot};
use thiserror::Error;

/// Protocol violations and capacity failures raised by a gate.
///
/// Timeouts are not errors; they surface as `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("gate has been destroyed: {0}")]
    Destroyed(GateSnapshot),
    #[error("gate is full: {0}")]
    Full(GateSnapshot),
    #[error("exit without a matching enter: {0}")]
    NotEntered(GateSnapshot),
    #[error("gate was not closed by {contender}: {snapshot}")]
    NotCloser {
        contender: ContenderId,
        snapshot: GateSnapshot,
    },
    #[error("gate is not closed: {0}")]
    NotClosed(GateSnapshot),
}

impl GateError {
    /// State of the gate when the error was raised
    pub fn snapshot(&self) -> &GateSnapshot {
        match self {
            GateError::Destroyed(s)
            | GateError::Full(s)
            | GateError::NotEntered(s)
            | GateError::NotClosed(s) => s,
            GateError::NotCloser { snapshot, .. } => snapshot,
        }
    }
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}
