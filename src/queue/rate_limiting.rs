// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Rate-limit policy for URL mutations.
//!
//! Throttle flushes on the trailing edge of a fixed window; debounce restarts
//! its window on every write and flushes only after a quiet period.
//!
//! # Example
//!
//! ```
//! use query_sync::queue::rate_limiting::{RateLimit, RateLimitMethod};
//! use std::time::Duration;
//!
//! let limit = RateLimit::debounce(Duration::from_millis(250));
//! assert_eq!(limit.method, RateLimitMethod::Debounce);
//!
//! // Default: 50ms throttle, tuned to stay under browser History API limits.
//! assert_eq!(RateLimit::default().time, Duration::from_millis(50));
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Default interval between URL mutations.
pub const DEFAULT_RATE_LIMIT_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitMethod {
    /// Flush on a trailing schedule relative to the last flush.
    Throttle,
    /// Restart the window on every push, flush after a quiet period.
    Debounce,
}

/// Maximum rate of URL mutations: a method plus an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub method: RateLimitMethod,
    pub time: Duration,
}

impl RateLimit {
    #[must_use]
    pub fn throttle(time: Duration) -> Self {
        Self {
            method: RateLimitMethod::Throttle,
            time,
        }
    }

    #[must_use]
    pub fn throttle_ms(millis: u64) -> Self {
        Self::throttle(Duration::from_millis(millis))
    }

    #[must_use]
    pub fn debounce(time: Duration) -> Self {
        Self {
            method: RateLimitMethod::Debounce,
            time,
        }
    }

    #[must_use]
    pub fn is_debounce(&self) -> bool {
        self.method == RateLimitMethod::Debounce
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::throttle(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_50ms_throttle() {
        let limit = RateLimit::default();
        assert_eq!(limit.method, RateLimitMethod::Throttle);
        assert_eq!(limit.time, Duration::from_millis(50));
    }

    #[test]
    fn test_constructors() {
        let t = RateLimit::throttle(Duration::from_millis(10));
        assert!(!t.is_debounce());
        let d = RateLimit::debounce(Duration::from_millis(10));
        assert!(d.is_debounce());
    }
}
