// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped gate acquisition

use super::Gate;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

/// What a [`Sentry`] does when dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentryAction {
    Exit,
    Open,
}

/// Releases an enter or close when dropped. Dereferences to the gate's
/// resource.
///
/// Not `Send`: thread-keyed gate bookkeeping requires the release to happen
/// on the thread that acquired.
#[must_use = "dropping a sentry immediately releases the gate"]
pub struct Sentry<'a, G: Gate + ?Sized> {
    gate: &'a G,
    action: SentryAction,
    _not_send: PhantomData<Rc<()>>,
}

impl<'a, G: Gate + ?Sized> Sentry<'a, G> {
    pub(crate) fn new(gate: &'a G, action: SentryAction) -> Self {
        Self {
            gate,
            action,
            _not_send: PhantomData,
        }
    }

    pub fn action(&self) -> SentryAction {
        self.action
    }

    pub fn gate(&self) -> &'a G {
        self.gate
    }

    pub fn resource(&self) -> &'a G::Resource {
        self.gate.resource()
    }
}

impl<G: Gate + ?Sized> Deref for Sentry<'_, G> {
    type Target = G::Resource;

    fn deref(&self) -> &G::Resource {
        self.gate.resource()
    }
}

impl<G: Gate + ?Sized> Drop for Sentry<'_, G> {
    fn drop(&mut self) {
        let result = match self.action {
            SentryAction::Exit => self.gate.exit(),
            SentryAction::Open => self.gate.open(),
        };
        if let Err(e) = result {
            tracing::error!(action = ?self.action, error = %e, "sentry failed to release gate");
        }
    }
}

impl<G: Gate + ?Sized> std::fmt::Debug for Sentry<'_, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sentry").field("action", &self.action).finish()
    }
}
