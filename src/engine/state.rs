// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed single-key bindings.
//!
//! [`QueryState`] wraps a one-key [`QueryStates`] binding so the common case
//! reads and writes a concrete type without touching [`DynValue`].
//!
//! [`DynValue`]: crate::parser::DynValue

use std::marker::PhantomData;

use super::binding::{BindingError, QueryStates, Update};
use crate::options::Options;
use crate::queue::FlushTicket;
use crate::sync::{SyncPayload, SyncSubscription};

/// A typed binding over a single key.
pub struct QueryState<T> {
    states: QueryStates,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + Sync + 'static> QueryState<T> {
    pub(crate) fn new(states: QueryStates, key: String) -> Self {
        Self {
            states,
            key,
            _marker: PhantomData,
        }
    }

    /// Current value, reading through the mutation queues. `None` when the
    /// key is absent and declares no default.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.states.get::<T>(&self.key)
    }

    /// Write a new value with the binding's options.
    pub fn set(&self, value: T) -> Result<FlushTicket, BindingError> {
        self.set_opts(value, &Options::new())
    }

    /// Write a new value with per-call option overrides.
    pub fn set_opts(&self, value: T, options: &Options) -> Result<FlushTicket, BindingError> {
        self.states.set(Update::new().set(&*self.key, value), options)
    }

    /// Remove the key from the URL; reads fall back to the parser default.
    pub fn clear(&self) -> Result<FlushTicket, BindingError> {
        self.states.set(Update::new().clear(&*self.key), &Options::new())
    }

    /// Listen for writes to this key from any binding in the scope.
    #[must_use]
    pub fn on_change(
        &self,
        callback: impl Fn(&SyncPayload) + Send + Sync + 'static,
    ) -> SyncSubscription {
        self.states.on_change(&*self.key, callback)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> std::fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryState").field("key", &self.key).finish()
    }
}
