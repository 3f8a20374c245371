// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory adapter for tests.
//!
//! Records every URL update so assertions can inspect what was flushed, when,
//! and with which options. With [`TestAdapter::with_memory`] the stored
//! params track each update, simulating a real adapter; otherwise reads stay
//! frozen at the initial value.
//!
//! # Example
//!
//! ```
//! use query_sync::adapter::{TestAdapter, UrlAdapter};
//!
//! let adapter = TestAdapter::new("?page=2");
//! assert_eq!(adapter.search_params().get("page"), Some("2"));
//! assert!(adapter.updates().is_empty());
//! ```

use parking_lot::Mutex;

use super::{AdapterError, UrlAdapter};
use crate::options::UpdateOptions;
use crate::search_params::SearchParams;

/// One recorded URL mutation.
#[derive(Debug, Clone)]
pub struct UrlUpdate {
    pub search_params: SearchParams,
    pub query_string: String,
    pub options: UpdateOptions,
}

/// In-memory [`UrlAdapter`] with recorded updates and injectable failure.
pub struct TestAdapter {
    params: Mutex<SearchParams>,
    updates: Mutex<Vec<UrlUpdate>>,
    has_memory: bool,
    rate_limit_factor: f64,
    auto_reset: bool,
    fail_next: Mutex<Option<String>>,
}

impl TestAdapter {
    /// New adapter seeded from a query string. By default the rate-limit
    /// factor is 0.0 (no throttling in tests) and params are frozen to the
    /// initial value.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self {
            params: Mutex::new(SearchParams::from_query_string(initial)),
            updates: Mutex::new(Vec::new()),
            has_memory: false,
            rate_limit_factor: 0.0,
            auto_reset: true,
            fail_next: Mutex::new(None),
        }
    }

    /// Track updates in the stored params, like a real adapter would.
    #[must_use]
    pub fn with_memory(mut self) -> Self {
        self.has_memory = true;
        self
    }

    /// Enable throttling during tests with a custom factor.
    #[must_use]
    pub fn with_rate_limit_factor(mut self, factor: f64) -> Self {
        self.rate_limit_factor = factor;
        self
    }

    #[must_use]
    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    /// Make the next `update_url` call fail with `message`.
    pub fn fail_next_update(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Every recorded update, oldest first.
    #[must_use]
    pub fn updates(&self) -> Vec<UrlUpdate> {
        self.updates.lock().clone()
    }

    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    /// The most recently flushed query string, e.g. `"?page=3"`.
    #[must_use]
    pub fn last_query_string(&self) -> Option<String> {
        self.updates.lock().last().map(|u| u.query_string.clone())
    }
}

impl UrlAdapter for TestAdapter {
    fn search_params(&self) -> SearchParams {
        self.params.lock().clone()
    }

    fn update_url(
        &self,
        search: &SearchParams,
        options: &UpdateOptions,
    ) -> Result<(), AdapterError> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(AdapterError::new(message));
        }
        self.updates.lock().push(UrlUpdate {
            search_params: search.clone(),
            query_string: search.render(),
            options: *options,
        });
        if self.has_memory {
            *self.params.lock() = search.clone();
        }
        Ok(())
    }

    fn rate_limit_factor(&self) -> f64 {
        self.rate_limit_factor
    }

    fn auto_reset_queue_on_update(&self) -> bool {
        self.auto_reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_updates() {
        let adapter = TestAdapter::new("");
        let mut search = SearchParams::new();
        search.set("a", "1");
        adapter
            .update_url(&search, &UpdateOptions::default())
            .unwrap();
        assert_eq!(adapter.update_count(), 1);
        assert_eq!(adapter.last_query_string(), Some("?a=1".to_string()));
    }

    #[test]
    fn test_frozen_params_without_memory() {
        let adapter = TestAdapter::new("?a=0");
        let mut search = SearchParams::new();
        search.set("a", "1");
        adapter
            .update_url(&search, &UpdateOptions::default())
            .unwrap();
        assert_eq!(adapter.search_params().get("a"), Some("0"));
    }

    #[test]
    fn test_memory_tracks_updates() {
        let adapter = TestAdapter::new("?a=0").with_memory();
        let mut search = SearchParams::new();
        search.set("a", "1");
        adapter
            .update_url(&search, &UpdateOptions::default())
            .unwrap();
        assert_eq!(adapter.search_params().get("a"), Some("1"));
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let adapter = TestAdapter::new("");
        adapter.fail_next_update("boom");
        let search = SearchParams::new();
        assert!(adapter
            .update_url(&search, &UpdateOptions::default())
            .is_err());
        assert!(adapter
            .update_url(&search, &UpdateOptions::default())
            .is_ok());
    }
}
