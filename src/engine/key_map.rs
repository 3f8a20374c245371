// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Declarative binding maps: logical state keys to URL keys and parsers.

use crate::parser::ErasedParser;

/// One bound key: the logical name state is addressed by, the URL parameter
/// it maps to, and the parser that converts between them.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub state_key: String,
    pub url_key: String,
    pub parser: ErasedParser,
}

/// An ordered set of key bindings, built declaratively.
///
/// # Example
///
/// ```
/// use query_sync::engine::KeyMap;
/// use query_sync::parser::builtins::{integer, string};
///
/// let map = KeyMap::new()
///     .key("page", integer().with_default(0).erased())
///     .key_as("search", "q", string().erased());
/// assert_eq!(map.entries().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    entries: Vec<KeyEntry>,
}

impl KeyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to the URL parameter of the same name.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already bound; a duplicate is a setup error.
    #[must_use]
    pub fn key(self, key: impl Into<String>, parser: ErasedParser) -> Self {
        let key = key.into();
        let url_key = key.clone();
        self.key_as(key, url_key, parser)
    }

    /// Bind a logical `state_key` to a differently-named URL parameter.
    ///
    /// # Panics
    ///
    /// Panics if `state_key` is already bound; a duplicate is a setup error.
    #[must_use]
    pub fn key_as(
        mut self,
        state_key: impl Into<String>,
        url_key: impl Into<String>,
        parser: ErasedParser,
    ) -> Self {
        let state_key = state_key.into();
        assert!(
            !self.entries.iter().any(|e| e.state_key == state_key),
            "duplicate key in key map: {state_key}"
        );
        self.entries.push(KeyEntry {
            state_key,
            url_key: url_key.into(),
            parser,
        });
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, state_key: &str) -> Option<&KeyEntry> {
        self.entries.iter().find(|e| e.state_key == state_key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::builtins::{integer, string};

    #[test]
    fn test_key_binds_same_url_name() {
        let map = KeyMap::new().key("page", integer().erased());
        let entry = map.entry("page").unwrap();
        assert_eq!(entry.url_key, "page");
    }

    #[test]
    fn test_key_as_binds_different_url_name() {
        let map = KeyMap::new().key_as("search", "q", string().erased());
        let entry = map.entry("search").unwrap();
        assert_eq!(entry.url_key, "q");
        assert!(map.entry("q").is_none());
    }

    #[test]
    fn test_order_is_preserved() {
        let map = KeyMap::new()
            .key("b", integer().erased())
            .key("a", integer().erased());
        let keys: Vec<_> = map.entries().iter().map(|e| e.state_key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn test_duplicate_key_panics() {
        let _ = KeyMap::new()
            .key("page", integer().erased())
            .key("page", string().erased());
    }
}
