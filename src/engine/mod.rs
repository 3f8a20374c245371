// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The engine scope: one adapter, one queue pair, one sync bus.
//!
//! A [`QueryEngine`] owns everything bindings share. Bindings created from
//! the same engine coalesce their writes into the same flush cycles and see
//! each other's unflushed values; separate engines are fully isolated.
//!
//! The engine spawns flush timers on the ambient tokio runtime, so it must
//! be constructed and used inside one.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use query_sync::adapter::TestAdapter;
//! use query_sync::engine::{KeyMap, QueryEngine};
//! use query_sync::parser::builtins::integer;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = QueryEngine::new(Arc::new(TestAdapter::new("?page=2")));
//! let states = engine.bind(
//!     KeyMap::new().key("page", integer().with_default(0).erased()),
//!     Default::default(),
//! );
//! assert_eq!(states.get::<i64>("page"), Some(2));
//! # }
//! ```

mod binding;
mod key_map;
mod state;

pub use binding::{BindingError, QueryStates, StateMap, Update};
pub use key_map::{KeyEntry, KeyMap};
pub use state::QueryState;

use std::sync::Arc;

use tracing::debug;

use crate::adapter::{AdapterContext, ProcessUrlSearchParams, UrlAdapter};
use crate::config::QueryEngineConfig;
use crate::options::Options;
use crate::parser::ErasedParser;
use crate::queue::{DebounceController, FlushTicket, ThrottledQueue};
use crate::search_params::SearchParams;
use crate::sync::SyncBus;

/// Shared state for a scope of bindings over one URL adapter.
pub struct QueryEngine {
    ctx: AdapterContext,
    throttle: Arc<ThrottledQueue>,
    debounce: Arc<DebounceController>,
    bus: Arc<SyncBus>,
    default_options: Options,
}

impl QueryEngine {
    /// New engine with default options.
    #[must_use]
    pub fn new(adapter: Arc<dyn UrlAdapter>) -> Self {
        Self::with_config(adapter, &QueryEngineConfig::default())
    }

    /// New engine with engine-level option defaults taken from `config`.
    #[must_use]
    pub fn with_config(adapter: Arc<dyn UrlAdapter>, config: &QueryEngineConfig) -> Self {
        let throttle = Arc::new(ThrottledQueue::new());
        Self {
            ctx: AdapterContext::new(adapter),
            debounce: Arc::new(DebounceController::new(throttle.clone())),
            throttle,
            bus: Arc::new(SyncBus::new()),
            default_options: config.as_options(),
        }
    }

    /// Install a hook over the final merged query string, applied just
    /// before each adapter handoff.
    #[must_use]
    pub fn with_process(mut self, process: ProcessUrlSearchParams) -> Self {
        self.ctx = self.ctx.with_process(process);
        self
    }

    /// Bind a set of keys. `options` layers over the engine defaults for
    /// every write through this binding.
    #[must_use]
    pub fn bind(&self, key_map: KeyMap, options: Options) -> QueryStates {
        debug!(keys = key_map.entries().len(), "creating binding");
        QueryStates::new(
            self.ctx.clone(),
            self.throttle.clone(),
            self.debounce.clone(),
            self.bus.clone(),
            key_map,
            self.default_options.merged_with(&options),
        )
    }

    /// Bind a single key to a typed state handle.
    #[must_use]
    pub fn bind_key<T: Clone + Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        parser: ErasedParser,
        options: Options,
    ) -> QueryState<T> {
        let key = key.into();
        let states = self.bind(KeyMap::new().key(key.clone(), parser), options);
        QueryState::new(states, key)
    }

    /// The adapter's current search params, ignoring queued writes.
    #[must_use]
    pub fn search_params(&self) -> SearchParams {
        self.ctx.snapshot()
    }

    /// The in-flight flush ticket, or a ready ticket when the queue is idle.
    #[must_use]
    pub fn pending_ticket(&self) -> FlushTicket {
        self.throttle.pending_ticket(&self.ctx)
    }

    /// Drop every queued write and cancel all timers. Outstanding throttle
    /// tickets resolve; debounce tickets reject as aborted.
    pub fn reset_queues(&self) {
        self.debounce.abort_all();
        let keys = self.throttle.abort();
        if !keys.is_empty() {
            debug!(dropped = keys.len(), "reset queues with pending updates");
        }
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("default_options", &self.default_options)
            .finish_non_exhaustive()
    }
}
