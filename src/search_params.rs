// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query-string values: the [`Query`] type, the ordered [`SearchParams`]
//! multimap, and the low-level comparator and writer primitives.
//!
//! A scalar string and a one-element list are treated as equivalent by
//! [`compare_query`]. Writing an empty list through [`write`] leaves the key
//! present with an empty value, which is observably different from removing
//! the key.
//!
//! # Example
//!
//! ```
//! use query_sync::search_params::{Query, SearchParams, write};
//!
//! let mut params = SearchParams::from_query_string("?page=2");
//! write(&Query::Single("3".into()), "page", &mut params);
//! assert_eq!(params.render(), "?page=3");
//! ```

use std::fmt;

/// A serialized query value: a single string, or an ordered list of strings
/// (repeated same-named parameters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Single(String),
    List(Vec<String>),
}

impl Query {
    /// View the value as an ordered slice of strings.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Query::Single(s) => std::slice::from_ref(s),
            Query::List(items) => items.as_slice(),
        }
    }

    /// First element, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.as_slice().first().map(String::as_str)
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Query::Single(s.to_string())
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Query::Single(s)
    }
}

impl From<Vec<String>> for Query {
    fn from(items: Vec<String>) -> Self {
        Query::List(items)
    }
}

/// An ordered multimap of query-string parameters.
///
/// Mirrors `URLSearchParams` semantics: insertion order is preserved,
/// [`SearchParams::set`] replaces the first occurrence in place and drops the
/// rest, [`SearchParams::append`] adds at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Parse from a query string, with or without the leading `?`.
    /// Percent-decoding and `+`-as-space follow form-urlencoded rules.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Set `key` to a single value: the first occurrence is replaced in
    /// place, any later occurrences are removed. Appends when absent.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut replaced = false;
        self.pairs.retain_mut(|(k, v)| {
            if k != key {
                return true;
            }
            if replaced {
                return false;
            }
            replaced = true;
            *v = value.to_string();
            true
        });
        if !replaced {
            self.append(key, value);
        }
    }

    /// Append a value for `key` at the end.
    pub fn append(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Remove every occurrence of `key`.
    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Keys in order of first occurrence (duplicates included).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize to a form-urlencoded query string, without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    /// Render as `?…`, or the empty string when there are no parameters.
    #[must_use]
    pub fn render(&self) -> String {
        let qs = self.to_query_string();
        if qs.is_empty() {
            qs
        } else {
            format!("?{qs}")
        }
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromIterator<(String, String)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// True when the query value reads as absent from the URL: either no value at
/// all, or an empty list. A present-but-empty single value (`Single("")`) is
/// *not* absent.
#[must_use]
pub fn is_absent(query: Option<&Query>) -> bool {
    match query {
        None => true,
        Some(Query::List(items)) => items.is_empty(),
        Some(Query::Single(_)) => false,
    }
}

/// Structural equality over query values, treating a scalar and a one-element
/// list as equal. Lists compare equal iff same length and pairwise equal in
/// order. Only two absent values compare equal.
#[must_use]
pub fn compare_query(a: Option<&Query>, b: Option<&Query>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.as_slice() == b.as_slice(),
        _ => false,
    }
}

/// Write a serialized value for `key` into `params`.
///
/// A single value replaces any prior entries for the key. A list clears the
/// key first then appends every element in order; an empty list still leaves
/// the key present with an empty value.
pub fn write(serialized: &Query, key: &str, params: &mut SearchParams) {
    match serialized {
        Query::Single(value) => {
            // set() also collapses any prior multi-value entries
            params.set(key, value);
        }
        Query::List(items) => {
            params.remove(key);
            for item in items {
                params.append(key, item);
            }
            if !params.contains_key(key) {
                params.set(key, "");
            }
        }
    }
}
