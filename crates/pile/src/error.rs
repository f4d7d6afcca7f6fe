// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use concord_core::GateError;
use thiserror::Error;

/// Errors raised by association piles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PileError {
    #[error("release of {association} which is not outstanding")]
    NotPending { association: String },
    #[error("pile gate failure: {0}")]
    Gate(#[from] GateError),
}
