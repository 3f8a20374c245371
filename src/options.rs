// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Update options and the layered option resolver.
//!
//! Options are merged from four layers with a fixed precedence, most specific
//! first: per-call > per-key (parser) > engine defaults > hard defaults.
//! [`resolve`] is a pure function over those layers.
//!
//! # Example
//!
//! ```
//! use query_sync::options::{resolve, History, Options};
//!
//! let call = Options::new().history(History::Push);
//! let resolved = resolve(&call, &Options::new(), &Options::new());
//! assert_eq!(resolved.history, History::Push);
//! assert!(resolved.shallow); // hard default
//! ```

use serde::Deserialize;

use crate::queue::rate_limiting::RateLimit;

/// How a query update affects the host's history stack.
///
/// `Push` creates a new history entry (Back button steps through updates),
/// `Replace` (the default) keeps the current history point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum History {
    Replace,
    Push,
}

/// A partial option layer. Unset fields defer to the next layer down.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// History mode for the URL update.
    pub history: Option<History>,
    /// Scroll to top after the update.
    pub scroll: Option<bool>,
    /// Shallow mode keeps the update client-side only (advisory to the host
    /// routing layer).
    pub shallow: Option<bool>,
    /// Rate limit applied to URL mutations for this key.
    pub rate_limit: Option<RateLimit>,
    /// Remove the key from the URL when its value equals the declared default.
    pub clear_on_default: Option<bool>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    #[must_use]
    pub fn scroll(mut self, scroll: bool) -> Self {
        self.scroll = Some(scroll);
        self
    }

    #[must_use]
    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = Some(shallow);
        self
    }

    #[must_use]
    pub fn rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    #[must_use]
    pub fn clear_on_default(mut self, clear: bool) -> Self {
        self.clear_on_default = Some(clear);
        self
    }

    /// Overlay `over` on top of `self`: set fields in `over` win.
    #[must_use]
    pub fn merged_with(&self, over: &Options) -> Options {
        Options {
            history: over.history.or(self.history),
            scroll: over.scroll.or(self.scroll),
            shallow: over.shallow.or(self.shallow),
            rate_limit: over.rate_limit.or(self.rate_limit),
            clear_on_default: over.clear_on_default.or(self.clear_on_default),
        }
    }
}

/// Fully-resolved per-update options handed to the URL adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub history: History,
    pub scroll: bool,
    pub shallow: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            history: History::Replace,
            scroll: false,
            shallow: true,
        }
    }
}

/// The outcome of resolving all option layers for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedOptions {
    pub history: History,
    pub scroll: bool,
    pub shallow: bool,
    pub rate_limit: RateLimit,
    pub clear_on_default: bool,
}

impl ResolvedOptions {
    #[must_use]
    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions {
            history: self.history,
            scroll: self.scroll,
            shallow: self.shallow,
        }
    }
}

/// Resolve the option layers with fixed precedence:
/// call > key > engine defaults > hard defaults.
///
/// Hard defaults: history `Replace`, scroll `false`, shallow `true`,
/// clear-on-default `true`, 50 ms throttle.
#[must_use]
pub fn resolve(call: &Options, key: &Options, engine: &Options) -> ResolvedOptions {
    let pick = |f: fn(&Options) -> Option<History>| f(call).or(f(key)).or(f(engine));
    let pick_bool = |f: fn(&Options) -> Option<bool>| f(call).or(f(key)).or(f(engine));
    ResolvedOptions {
        history: pick(|o| o.history).unwrap_or(History::Replace),
        scroll: pick_bool(|o| o.scroll).unwrap_or(false),
        shallow: pick_bool(|o| o.shallow).unwrap_or(true),
        rate_limit: call
            .rate_limit
            .or(key.rate_limit)
            .or(engine.rate_limit)
            .unwrap_or_default(),
        clear_on_default: pick_bool(|o| o.clear_on_default).unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::rate_limiting::RateLimit;
    use std::time::Duration;

    #[test]
    fn test_hard_defaults() {
        let empty = Options::new();
        let resolved = resolve(&empty, &empty, &empty);
        assert_eq!(resolved.history, History::Replace);
        assert!(!resolved.scroll);
        assert!(resolved.shallow);
        assert!(resolved.clear_on_default);
        assert_eq!(resolved.rate_limit, RateLimit::default());
    }

    #[test]
    fn test_call_beats_key_beats_engine() {
        let engine = Options::new().scroll(true).history(History::Push);
        let key = Options::new().scroll(false);
        let call = Options::new().history(History::Replace);
        let resolved = resolve(&call, &key, &engine);
        assert_eq!(resolved.history, History::Replace); // call wins
        assert!(!resolved.scroll); // key wins over engine
    }

    #[test]
    fn test_rate_limit_precedence() {
        let engine = Options::new().rate_limit(RateLimit::throttle(Duration::from_millis(200)));
        let key = Options::new().rate_limit(RateLimit::debounce(Duration::from_millis(100)));
        let resolved = resolve(&Options::new(), &key, &engine);
        assert_eq!(
            resolved.rate_limit,
            RateLimit::debounce(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_merged_with() {
        let base = Options::new().scroll(true).shallow(false);
        let over = Options::new().scroll(false);
        let merged = base.merged_with(&over);
        assert_eq!(merged.scroll, Some(false));
        assert_eq!(merged.shallow, Some(false));
    }
}
