// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gate that never blocks

use super::{Gate, Timeout};
use crate::error::GateError;

/// A gate where every operation succeeds immediately and nothing is tracked.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopGate;

impl Gate for NoopGate {
    type Resource = ();

    fn resource(&self) -> &() {
        &()
    }

    fn enter(&self, _timeout: Timeout) -> Result<bool, GateError> {
        Ok(true)
    }

    fn exit(&self) -> Result<(), GateError> {
        Ok(())
    }

    fn close(&self, _timeout: Timeout) -> Result<bool, GateError> {
        Ok(true)
    }

    fn open(&self) -> Result<(), GateError> {
        Ok(())
    }

    fn bar_entry(&self, _timeout: Timeout) -> Result<bool, GateError> {
        Ok(true)
    }

    fn destroy(&self) -> Result<(), GateError> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn is_closed_by_current_thread(&self) -> bool {
        false
    }

    fn is_entered_by_current_thread(&self) -> bool {
        false
    }

    fn active_count(&self) -> u64 {
        0
    }
}
