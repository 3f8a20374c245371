// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed, composable parsers for query-string values.
//!
//! A [`Parser`] pairs a parse and a serialize function, an equality relation,
//! and optional per-key options and default value. Parsers are immutable
//! values: [`Parser::with_default`] and [`Parser::with_options`] return new
//! instances, so a shared built-in is never mutated in place.
//!
//! Parse failure is `None`, never a panic: malformed URL values fail closed
//! and degrade to the key's default downstream.
//!
//! # Example
//!
//! ```
//! use query_sync::parser::builtins::integer;
//!
//! let page = integer().with_default(0);
//! assert_eq!(page.parse("3"), Some(3));
//! assert_eq!(page.parse("not-a-number"), None);
//! ```

pub mod builtins;
mod erased;

pub use erased::{DynValue, ErasedParser};
pub(crate) use erased::downcast_value;

use std::sync::Arc;

use crate::options::Options;
use crate::search_params::Query;

/// Discriminates scalar parsers (one query value) from multi-value parsers
/// (repeated same-named parameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Single,
    Multi,
}

type SingleParseFn<T> = Arc<dyn Fn(&str) -> Option<T> + Send + Sync>;
type SingleSerializeFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
type MultiParseFn<T> = Arc<dyn Fn(&[String]) -> Option<T> + Send + Sync>;
type MultiSerializeFn<T> = Arc<dyn Fn(&T) -> Vec<String> + Send + Sync>;
type EqFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

enum Codec<T> {
    Single {
        parse: SingleParseFn<T>,
        serialize: SingleSerializeFn<T>,
    },
    Multi {
        parse: MultiParseFn<T>,
        serialize: MultiSerializeFn<T>,
    },
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        match self {
            Codec::Single { parse, serialize } => Codec::Single {
                parse: parse.clone(),
                serialize: serialize.clone(),
            },
            Codec::Multi { parse, serialize } => Codec::Multi {
                parse: parse.clone(),
                serialize: serialize.clone(),
            },
        }
    }
}

/// A typed parse/serialize/equality unit for one query key.
pub struct Parser<T> {
    codec: Codec<T>,
    eq: EqFn<T>,
    default: Option<T>,
    options: Options,
}

impl<T: Clone> Clone for Parser<T> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            eq: self.eq.clone(),
            default: self.default.clone(),
            options: self.options.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Parser<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("kind", &self.kind())
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: PartialEq> Parser<T> {
    /// Build a scalar parser from a parse and a serialize function.
    /// Equality defaults to `PartialEq`; override with [`Parser::with_eq`].
    pub fn new(
        parse: impl Fn(&str) -> Option<T> + Send + Sync + 'static,
        serialize: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            codec: Codec::Single {
                parse: Arc::new(parse),
                serialize: Arc::new(serialize),
            },
            eq: Arc::new(|a, b| a == b),
            default: None,
            options: Options::default(),
        }
    }

    /// Build a multi-value parser over repeated same-named parameters.
    pub fn multi(
        parse: impl Fn(&[String]) -> Option<T> + Send + Sync + 'static,
        serialize: impl Fn(&T) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            codec: Codec::Multi {
                parse: Arc::new(parse),
                serialize: Arc::new(serialize),
            },
            eq: Arc::new(|a, b| a == b),
            default: None,
            options: Options::default(),
        }
    }
}

impl<T> Parser<T> {
    #[must_use]
    pub fn kind(&self) -> ParserKind {
        match self.codec {
            Codec::Single { .. } => ParserKind::Single,
            Codec::Multi { .. } => ParserKind::Multi,
        }
    }

    /// Replace the equality relation used for clear-on-default and
    /// bijectivity checks.
    #[must_use]
    pub fn with_eq(mut self, eq: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        self.eq = Arc::new(eq);
        self
    }

    /// Derive a parser whose absent/unparseable values resolve to `default`.
    #[must_use]
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    /// Derive a parser carrying merged per-key options (history, scroll,
    /// rate limit, ...) read as overrides by the binding engine.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = self.options.merged_with(&options);
        self
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Parse a single raw value. A multi-value parser sees it as a
    /// one-element list.
    #[must_use]
    pub fn parse(&self, value: &str) -> Option<T> {
        match &self.codec {
            Codec::Single { parse, .. } => parse(value),
            Codec::Multi { parse, .. } => parse(&[value.to_string()]),
        }
    }

    /// Parse a query value. A scalar parser applied to a list parses only the
    /// first element; a multi-value parser always sees the whole list.
    #[must_use]
    pub fn parse_query(&self, query: &Query) -> Option<T> {
        match &self.codec {
            Codec::Single { parse, .. } => query.first().and_then(|v| parse(v)),
            Codec::Multi { parse, .. } => parse(query.as_slice()),
        }
    }

    /// Serialize a value to its query-string form.
    #[must_use]
    pub fn serialize_query(&self, value: &T) -> Query {
        match &self.codec {
            Codec::Single { serialize, .. } => Query::Single(serialize(value)),
            Codec::Multi { serialize, .. } => Query::List(serialize(value)),
        }
    }

    /// Compare two values with the parser's equality relation.
    #[must_use]
    pub fn eq(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }
}

impl<T: Clone> Parser<T> {
    /// External-render path, for environments without a live URL: an absent
    /// value resolves to the default (if any), and so does a value that fails
    /// to parse.
    #[must_use]
    pub fn parse_external(&self, value: Option<&Query>) -> Option<T> {
        match value {
            None => self.default.clone(),
            Some(query) => self.parse_query(query).or_else(|| self.default.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::History;

    fn upper() -> Parser<String> {
        Parser::new(|v| Some(v.to_uppercase()), |v: &String| v.to_lowercase())
    }

    #[test]
    fn test_scalar_parse_and_serialize() {
        let p = upper();
        assert_eq!(p.kind(), ParserKind::Single);
        assert_eq!(p.parse("abc"), Some("ABC".to_string()));
        assert_eq!(
            p.serialize_query(&"ABC".to_string()),
            Query::Single("abc".into())
        );
    }

    #[test]
    fn test_scalar_parses_first_list_element() {
        let p = upper();
        let q = Query::List(vec!["a".into(), "b".into()]);
        assert_eq!(p.parse_query(&q), Some("A".to_string()));
        assert_eq!(p.parse_query(&Query::List(vec![])), None);
    }

    #[test]
    fn test_multi_parses_whole_list() {
        let p: Parser<usize> = Parser::multi(
            |items| Some(items.len()),
            |n| vec!["x".to_string(); *n],
        );
        assert_eq!(p.kind(), ParserKind::Multi);
        let q = Query::List(vec!["a".into(), "b".into()]);
        assert_eq!(p.parse_query(&q), Some(2));
        // A bare value reads as a one-element list.
        assert_eq!(p.parse_query(&Query::Single("a".into())), Some(1));
    }

    #[test]
    fn test_with_default_is_a_new_instance() {
        let base = upper();
        let with_default = base.clone().with_default("DEF".to_string());
        assert!(base.default_value().is_none());
        assert_eq!(with_default.default_value(), Some(&"DEF".to_string()));
    }

    #[test]
    fn test_with_options_merges() {
        let p = upper()
            .with_options(Options::new().scroll(true))
            .with_options(Options::new().history(History::Push));
        assert_eq!(p.options().scroll, Some(true));
        assert_eq!(p.options().history, Some(History::Push));
    }

    #[test]
    fn test_parse_external_absent_uses_default() {
        let p = upper().with_default("DEF".to_string());
        assert_eq!(p.parse_external(None), Some("DEF".to_string()));
    }

    #[test]
    fn test_parse_external_failure_uses_default() {
        let p = Parser::new(|_: &str| None::<String>, |v: &String| v.clone())
            .with_default("DEF".to_string());
        let q = Query::Single("anything".into());
        assert_eq!(p.parse_external(Some(&q)), Some("DEF".to_string()));
    }

    #[test]
    fn test_parse_external_without_default() {
        let p = upper();
        assert_eq!(p.parse_external(None), None);
        let q = Query::Single("ok".into());
        assert_eq!(p.parse_external(Some(&q)), Some("OK".to_string()));
    }

    #[test]
    fn test_custom_eq() {
        let p = upper().with_eq(|a, b| a.eq_ignore_ascii_case(b));
        assert!(p.eq(&"ab".to_string(), &"AB".to_string()));
    }
}
