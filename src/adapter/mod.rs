// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The URL adapter boundary.
//!
//! The engine never touches a real location bar or history API; it talks to a
//! [`UrlAdapter`]: read the current search params, and apply a mutated set
//! with resolved [`UpdateOptions`]. Host integrations (a browser bridge, a
//! router layer, the in-memory [`TestAdapter`]) implement this trait.
//!
//! The adapter call is synchronous from the engine's perspective; callers
//! that need the final query string await the flush ticket instead.

pub mod key_isolation;
pub mod testing;

pub use testing::TestAdapter;

use std::sync::Arc;

use thiserror::Error;

use crate::options::UpdateOptions;
use crate::search_params::SearchParams;

/// Raised by an adapter when the host refuses or fails a URL mutation.
/// Captured by the queue and surfaced only as a rejected flush ticket.
#[derive(Debug, Clone, Error)]
#[error("adapter error: {0}")]
pub struct AdapterError(pub String);

impl AdapterError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Host-side URL access consumed by the core.
pub trait UrlAdapter: Send + Sync {
    /// Current search params, as an ordered multimap.
    fn search_params(&self) -> SearchParams;

    /// Apply a fully-merged query string to the URL. `options.shallow` is
    /// advisory to the host routing layer.
    fn update_url(&self, search: &SearchParams, options: &UpdateOptions)
        -> Result<(), AdapterError>;

    /// Snapshot used by the flush path. Taken lazily, never cached, so
    /// overlapping flush cycles don't observe stale state.
    fn search_params_snapshot(&self) -> SearchParams {
        self.search_params()
    }

    /// Multiplier applied to the throttle interval. Tests use values below
    /// 1.0 to speed up rate limiting.
    fn rate_limit_factor(&self) -> f64 {
        1.0
    }

    /// Whether the queue clears its pending state as part of each flush.
    fn auto_reset_queue_on_update(&self) -> bool {
        true
    }
}

/// Hook applied to the final merged query string immediately before handoff
/// to [`UrlAdapter::update_url`].
pub type ProcessUrlSearchParams = Arc<dyn Fn(SearchParams) -> SearchParams + Send + Sync>;

/// Everything a queue needs to talk to the outside world.
#[derive(Clone)]
pub struct AdapterContext {
    pub adapter: Arc<dyn UrlAdapter>,
    pub process_url_search_params: Option<ProcessUrlSearchParams>,
}

impl AdapterContext {
    #[must_use]
    pub fn new(adapter: Arc<dyn UrlAdapter>) -> Self {
        Self {
            adapter,
            process_url_search_params: None,
        }
    }

    #[must_use]
    pub fn with_process(
        mut self,
        process: ProcessUrlSearchParams,
    ) -> Self {
        self.process_url_search_params = Some(process);
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> SearchParams {
        self.adapter.search_params_snapshot()
    }
}

impl std::fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext")
            .field("has_process", &self.process_url_search_params.is_some())
            .finish_non_exhaustive()
    }
}
