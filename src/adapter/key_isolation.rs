// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key isolation helpers for adapters.
//!
//! A host adapter watching a handful of keys should not re-render bindings
//! when unrelated parameters change. [`has_watched_change`] detects whether
//! any watched key differs between two param sets; [`filter_search_params`]
//! strips everything else.

use crate::search_params::{compare_query, Query, SearchParams};

fn key_query(params: &SearchParams, key: &str) -> Option<Query> {
    let values = params.get_all(key);
    if values.is_empty() {
        None
    } else {
        Some(Query::List(values.into_iter().map(String::from).collect()))
    }
}

/// True when any of `keys` has a different value between `old` and `new`.
/// An empty watch list means everything is watched.
#[must_use]
pub fn has_watched_change(old: &SearchParams, new: &SearchParams, keys: &[String]) -> bool {
    if keys.is_empty() {
        return old != new;
    }
    keys.iter().any(|key| {
        !compare_query(key_query(old, key).as_ref(), key_query(new, key).as_ref())
    })
}

/// Keep only the watched keys. An empty watch list passes everything through.
#[must_use]
pub fn filter_search_params(params: &SearchParams, keys: &[String]) -> SearchParams {
    if keys.is_empty() {
        return params.clone();
    }
    params
        .iter()
        .filter(|(k, _)| keys.iter().any(|key| key == k))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
