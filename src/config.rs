// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the query engine.
//!
//! # Example
//!
//! ```
//! use query_sync::QueryEngineConfig;
//!
//! // Minimal config (uses defaults)
//! let config = QueryEngineConfig::default();
//! assert_eq!(config.throttle_ms, 50);
//!
//! // Full config
//! let config = QueryEngineConfig {
//!     throttle_ms: 120,
//!     push_history: true,
//!     clear_on_default: false,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

use crate::options::{History, Options};
use crate::queue::{RateLimit, DEFAULT_RATE_LIMIT_MS};

/// Engine-level defaults for every binding in a scope. Per-key and per-call
/// options layer on top of these.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryEngineConfig {
    /// Push a new history entry per update instead of replacing the current one
    #[serde(default)]
    pub push_history: bool,

    /// Scroll to top after each URL update
    #[serde(default)]
    pub scroll: bool,

    /// Shallow updates (skip host-side data re-fetching)
    #[serde(default = "default_shallow")]
    pub shallow: bool,

    /// Remove a key from the URL when its value equals the parser default
    #[serde(default = "default_clear_on_default")]
    pub clear_on_default: bool,

    /// Default throttle window in milliseconds
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

fn default_shallow() -> bool { true }
fn default_clear_on_default() -> bool { true }
fn default_throttle_ms() -> u64 { DEFAULT_RATE_LIMIT_MS }

impl Default for QueryEngineConfig {
    fn default() -> Self {
        Self {
            push_history: false,
            scroll: false,
            shallow: default_shallow(),
            clear_on_default: default_clear_on_default(),
            throttle_ms: default_throttle_ms(),
        }
    }
}

impl QueryEngineConfig {
    /// The option layer this config contributes to resolution.
    #[must_use]
    pub fn as_options(&self) -> Options {
        Options::new()
            .history(if self.push_history {
                History::Push
            } else {
                History::Replace
            })
            .scroll(self.scroll)
            .shallow(self.shallow)
            .clear_on_default(self.clear_on_default)
            .rate_limit(RateLimit::throttle_ms(self.throttle_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = QueryEngineConfig::default();
        assert!(!config.push_history);
        assert!(!config.scroll);
        assert!(config.shallow);
        assert!(config.clear_on_default);
        assert_eq!(config.throttle_ms, 50);
    }

    #[test]
    fn test_as_options_maps_fields() {
        let config = QueryEngineConfig {
            push_history: true,
            throttle_ms: 200,
            ..Default::default()
        };
        let options = config.as_options();
        assert_eq!(options.history, Some(History::Push));
        assert_eq!(
            options.rate_limit.map(|r| r.time),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: QueryEngineConfig =
            serde_json::from_str(r#"{"throttle_ms": 75}"#).unwrap();
        assert_eq!(config.throttle_ms, 75);
        assert!(config.shallow);
    }
}
