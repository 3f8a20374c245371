// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cross-binding synchronization bus.
//!
//! Bindings over the same URL parameter may live in different parts of a
//! program, possibly under different logical names. When one of them writes,
//! the new value is broadcast here synchronously, keyed by URL key, before
//! the write enters the mutation queue, so every binding observes the update
//! in the same tick regardless of when the URL itself changes.
//!
//! Subscriptions unregister on drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::parser::DynValue;
use crate::search_params::Query;

/// One broadcast update: the parsed value and its serialized form. Both are
/// `None` for a deletion with no default.
#[derive(Clone)]
pub struct SyncPayload {
    pub state: Option<DynValue>,
    pub query: Option<Query>,
}

impl std::fmt::Debug for SyncPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPayload")
            .field("has_state", &self.state.is_some())
            .field("query", &self.query)
            .finish()
    }
}

type Callback = Arc<dyn Fn(&SyncPayload) + Send + Sync>;

/// Per-scope pub/sub keyed by URL key.
#[derive(Default)]
pub struct SyncBus {
    listeners: DashMap<String, Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl SyncBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `key`. The returned guard unsubscribes when
    /// dropped.
    #[must_use]
    pub fn subscribe(
        self: &Arc<Self>,
        key: impl Into<String>,
        callback: impl Fn(&SyncPayload) + Send + Sync + 'static,
    ) -> SyncSubscription {
        let key = key.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        SyncSubscription {
            bus: Arc::clone(self),
            key,
            id,
        }
    }

    /// Deliver `payload` to every listener on `key`, synchronously, in
    /// subscription order.
    pub fn emit(&self, key: &str, payload: &SyncPayload) {
        // Collect first so a callback can subscribe or drop subscriptions
        // without deadlocking against the map shard.
        let callbacks: Vec<Callback> = match self.listeners.get(key) {
            Some(entry) => entry.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return,
        };
        trace!(key, listeners = callbacks.len(), "emitting sync payload");
        for callback in callbacks {
            callback(payload);
        }
    }

    #[must_use]
    pub fn listener_count(&self, key: &str) -> usize {
        self.listeners.get(key).map_or(0, |entry| entry.len())
    }

    fn unsubscribe(&self, key: &str, id: u64) {
        if let Some(mut entry) = self.listeners.get_mut(key) {
            entry.retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

/// Guard for one registered listener; unsubscribes on drop.
pub struct SyncSubscription {
    bus: Arc<SyncBus>,
    key: String,
    id: u64,
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.key, self.id);
    }
}

impl std::fmt::Debug for SyncSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSubscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn payload(value: &str) -> SyncPayload {
        SyncPayload {
            state: Some(Arc::new(value.to_string()) as DynValue),
            query: Some(Query::Single(value.to_string())),
        }
    }

    #[test]
    fn test_emit_reaches_all_listeners_in_order() {
        let bus = Arc::new(SyncBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s1 = {
            let seen = seen.clone();
            bus.subscribe("page", move |_| seen.lock().push(1))
        };
        let s2 = {
            let seen = seen.clone();
            bus.subscribe("page", move |_| seen.lock().push(2))
        };
        bus.emit("page", &payload("3"));
        assert_eq!(*seen.lock(), vec![1, 2]);
        drop((s1, s2));
    }

    #[test]
    fn test_emit_is_scoped_to_key() {
        let bus = Arc::new(SyncBus::new());
        let hits = Arc::new(Mutex::new(0));
        let _sub = {
            let hits = hits.clone();
            bus.subscribe("page", move |_| *hits.lock() += 1)
        };
        bus.emit("other", &payload("x"));
        assert_eq!(*hits.lock(), 0);
        bus.emit("page", &payload("x"));
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = Arc::new(SyncBus::new());
        let sub = bus.subscribe("page", |_| {});
        assert_eq!(bus.listener_count("page"), 1);
        drop(sub);
        assert_eq!(bus.listener_count("page"), 0);
    }

    #[test]
    fn test_payload_carries_state_and_query() {
        let bus = Arc::new(SyncBus::new());
        let seen = Arc::new(Mutex::new(None));
        let _sub = {
            let seen = seen.clone();
            bus.subscribe("q", move |p: &SyncPayload| {
                *seen.lock() = Some((p.state.is_some(), p.query.clone()));
            })
        };
        bus.emit(
            "q",
            &SyncPayload {
                state: None,
                query: None,
            },
        );
        assert_eq!(*seen.lock(), Some((false, None)));
    }
}
