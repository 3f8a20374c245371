// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The multi-key binding engine.
//!
//! A [`QueryStates`] binding reads through the mutation queues: a value
//! queued but not yet flushed is what [`QueryStates::read`] reports, so every
//! binding in a scope agrees on the state in the same tick the write happens.
//! Reads fall back to the live URL snapshot, and finally to the parser
//! default.
//!
//! Writes broadcast on the sync bus first, then enter the rate-limited
//! queue; the returned [`FlushTicket`] resolves when the URL actually
//! changes.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::key_map::{KeyEntry, KeyMap};
use crate::adapter::AdapterContext;
use crate::options::{resolve, Options};
use crate::parser::{downcast_value, DynValue, ErasedParser, ParserKind};
use crate::queue::{DebounceController, FlushTicket, PendingUpdate, ThrottledQueue};
use crate::search_params::Query;
use crate::sync::{SyncBus, SyncPayload, SyncSubscription};

/// Raised by [`QueryStates::set`]. Reads never fail; writes fail only on
/// programming errors.
#[derive(Debug, Clone, Error)]
pub enum BindingError {
    /// The update names a key the binding's key map does not contain.
    #[error("unknown key: {0}")]
    UnknownKey(String),
    /// The update's value type does not match the key's parser.
    #[error("type mismatch for key: {0}")]
    TypeMismatch(String),
}

/// A snapshot of every bound key's parsed value. `None` entries are keys
/// that are absent from the URL and declare no default.
#[derive(Debug, Clone, Default)]
pub struct StateMap {
    values: HashMap<String, Option<DynValue>>,
}

impl StateMap {
    /// Typed access to one key's value. `None` when the key is missing from
    /// the map, carries no value, or holds a different type.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)?
            .as_ref()
            .and_then(downcast_value::<T>)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A batch of key updates, built declaratively. `None` clears the key from
/// the URL.
#[derive(Default)]
pub struct Update {
    fields: Vec<(String, Option<DynValue>)>,
}

impl Update {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    #[must_use]
    pub fn set<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.fields
            .push((key.into(), Some(Arc::new(value) as DynValue)));
        self
    }

    /// Remove `key` from the URL; reads fall back to the parser default.
    #[must_use]
    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.fields.push((key.into(), None));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Debug for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<_> = self.fields.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Update").field("keys", &keys).finish()
    }
}

/// A live binding over a set of keys, sharing its engine's queues and bus.
pub struct QueryStates {
    ctx: AdapterContext,
    throttle: Arc<ThrottledQueue>,
    debounce: Arc<DebounceController>,
    bus: Arc<SyncBus>,
    key_map: KeyMap,
    binding_options: Options,
}

impl QueryStates {
    pub(crate) fn new(
        ctx: AdapterContext,
        throttle: Arc<ThrottledQueue>,
        debounce: Arc<DebounceController>,
        bus: Arc<SyncBus>,
        key_map: KeyMap,
        binding_options: Options,
    ) -> Self {
        Self {
            ctx,
            throttle,
            debounce,
            bus,
            key_map,
            binding_options,
        }
    }

    /// Snapshot every bound key, reading through the mutation queues so
    /// unflushed writes are already visible.
    #[must_use]
    pub fn read(&self) -> StateMap {
        let snapshot = self.ctx.snapshot();
        let mut values = HashMap::with_capacity(self.key_map.entries().len());
        for entry in self.key_map.entries() {
            let query = match self.debounce.queued_query(&entry.url_key) {
                // Queued write wins; a queued deletion reads as absent.
                Some(queued) => queued,
                None => live_query(&snapshot, entry),
            };
            values.insert(entry.state_key.clone(), parse_with_default(&entry.parser, query));
        }
        StateMap { values }
    }

    /// Typed access to one key without materializing the whole map.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, state_key: &str) -> Option<T> {
        let entry = self.key_map.entry(state_key)?;
        let query = match self.debounce.queued_query(&entry.url_key) {
            Some(queued) => queued,
            None => live_query(&self.ctx.snapshot(), entry),
        };
        parse_with_default(&entry.parser, query).and_then(|v| downcast_value::<T>(&v))
    }

    /// Apply a batch of updates. Values are broadcast to sibling bindings
    /// immediately; the URL changes when the returned ticket resolves.
    ///
    /// Keys whose resolved rate limit is a debounce go through their per-key
    /// quiet window; everything else coalesces into the shared throttle
    /// flush. The ticket tracks the flush that carries the throttled keys,
    /// or the last debounced key when the batch is all-debounce.
    pub fn set(&self, update: Update, call_options: &Options) -> Result<FlushTicket, BindingError> {
        if update.is_empty() {
            return Ok(self.throttle.pending_ticket(&self.ctx));
        }

        let mut throttled = false;
        let mut debounce_ticket = None;

        for (state_key, value) in update.fields {
            let entry = self
                .key_map
                .entry(&state_key)
                .ok_or_else(|| BindingError::UnknownKey(state_key.clone()))?;
            let resolved = resolve(call_options, entry.parser.options(), &self.binding_options);

            let query = match &value {
                None => None,
                Some(v) => {
                    let serialized = entry
                        .parser
                        .serialize(v)
                        .ok_or_else(|| BindingError::TypeMismatch(state_key.clone()))?;
                    let is_default = resolved.clear_on_default
                        && entry
                            .parser
                            .default_value()
                            .is_some_and(|d| entry.parser.eq(v, d));
                    if is_default {
                        None
                    } else {
                        Some(serialized)
                    }
                }
            };

            // Siblings observe the new value before it reaches the queue.
            // Keyed by URL parameter, so bindings aliasing the same param
            // under different logical names stay in sync. A cleared key
            // broadcasts no state; listeners fall back to their default.
            let state = if query.is_some() { value } else { None };
            self.bus.emit(
                &entry.url_key,
                &SyncPayload {
                    state,
                    query: query.clone(),
                },
            );

            debug!(key = %entry.url_key, debounce = resolved.rate_limit.is_debounce(), "applying update");
            let pending = PendingUpdate {
                url_key: entry.url_key.clone(),
                query,
                options: resolved.update_options(),
            };
            if resolved.rate_limit.is_debounce() {
                debounce_ticket =
                    Some(self.debounce.push(pending, resolved.rate_limit.time, &self.ctx));
            } else {
                // A throttled write supersedes any in-flight debounce for
                // the same key.
                self.debounce.abort(&entry.url_key);
                self.throttle.push(pending, resolved.rate_limit.time);
                throttled = true;
            }
        }

        if throttled {
            Ok(self.throttle.flush(&self.ctx))
        } else {
            Ok(debounce_ticket.unwrap_or_else(|| self.throttle.pending_ticket(&self.ctx)))
        }
    }

    /// Read-modify-write in one step.
    pub fn set_with(
        &self,
        updater: impl FnOnce(&StateMap) -> Update,
        call_options: &Options,
    ) -> Result<FlushTicket, BindingError> {
        let current = self.read();
        self.set(updater(&current), call_options)
    }

    /// Listen for writes to `state_key`'s URL parameter from any binding in
    /// the scope, including bindings that alias the same parameter under a
    /// different logical name. A key outside this binding's map is taken as
    /// a URL key directly. The subscription lives as long as the returned
    /// guard.
    #[must_use]
    pub fn on_change(
        &self,
        state_key: impl Into<String>,
        callback: impl Fn(&SyncPayload) + Send + Sync + 'static,
    ) -> SyncSubscription {
        let state_key = state_key.into();
        let url_key = self
            .key_map
            .entry(&state_key)
            .map(|e| e.url_key.clone())
            .unwrap_or(state_key);
        self.bus.subscribe(url_key, callback)
    }

    #[must_use]
    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }
}

impl std::fmt::Debug for QueryStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStates")
            .field("keys", &self.key_map.entries().len())
            .finish_non_exhaustive()
    }
}

/// The URL's current value for a bound key. A multi-value key with no
/// occurrences is absent, not an empty list.
fn live_query(snapshot: &crate::search_params::SearchParams, entry: &KeyEntry) -> Option<Query> {
    match entry.parser.kind() {
        ParserKind::Single => snapshot
            .get(&entry.url_key)
            .map(|v| Query::Single(v.to_string())),
        ParserKind::Multi => {
            let values = snapshot.get_all(&entry.url_key);
            if values.is_empty() {
                None
            } else {
                Some(Query::List(values.into_iter().map(String::from).collect()))
            }
        }
    }
}

/// Absent or unparseable values degrade to the parser default.
fn parse_with_default(parser: &ErasedParser, query: Option<Query>) -> Option<DynValue> {
    match query {
        None => parser.default_value().cloned(),
        Some(q) => parser
            .parse_query(&q)
            .or_else(|| parser.default_value().cloned()),
    }
}
