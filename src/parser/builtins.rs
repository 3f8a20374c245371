// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Built-in parsers.
//!
//! Each parser is round-trip bijective on well-formed input and fails closed
//! (returns `None`) on malformed input rather than propagating an error into
//! the binding engine.
//!
//! # Example
//!
//! ```
//! use query_sync::parser::builtins::{array_of, integer};
//!
//! let tags = array_of(integer(), ',');
//! assert_eq!(tags.parse("1,2,3"), Some(vec![1, 2, 3]));
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::{Codec, Parser};
use crate::options::Options;

/// Pass-through string parser.
#[must_use]
pub fn string() -> Parser<String> {
    Parser::new(|v| Some(v.to_string()), String::clone)
}

/// Signed integer. Malformed input (including floats) parses to `None`.
#[must_use]
pub fn integer() -> Parser<i64> {
    Parser::new(|v| v.parse::<i64>().ok(), i64::to_string)
}

/// 1-based in the URL, 0-based in state. `?page=1` reads as `0`.
#[must_use]
pub fn index() -> Parser<i64> {
    Parser::new(|v| v.parse::<i64>().ok().map(|i| i - 1), |v| (v + 1).to_string())
}

/// Unsigned hexadecimal, serialized to an even number of digits.
#[must_use]
pub fn hex() -> Parser<u64> {
    Parser::new(
        |v| u64::from_str_radix(v, 16).ok(),
        |v| {
            let s = format!("{v:x}");
            if s.len() % 2 == 1 {
                format!("0{s}")
            } else {
                s
            }
        },
    )
}

/// Floating point number.
#[must_use]
pub fn float() -> Parser<f64> {
    Parser::new(|v| v.parse::<f64>().ok(), f64::to_string)
}

/// `"true"` (case-insensitive) is `true`; anything else is `false`.
#[must_use]
pub fn boolean() -> Parser<bool> {
    Parser::new(|v| Some(v.eq_ignore_ascii_case("true")), bool::to_string)
}

/// Unix timestamp in milliseconds.
#[must_use]
pub fn timestamp() -> Parser<DateTime<Utc>> {
    Parser::new(
        |v| {
            v.parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        },
        |v| v.timestamp_millis().to_string(),
    )
}

/// RFC 3339 / ISO 8601 date-time, serialized at millisecond precision in UTC.
#[must_use]
pub fn iso_date_time() -> Parser<DateTime<Utc>> {
    Parser::new(
        |v| {
            DateTime::parse_from_rfc3339(v)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        },
        |v| v.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// ISO 8601 calendar date (`YYYY-MM-DD`). Any time-of-day suffix is ignored
/// on parse.
#[must_use]
pub fn iso_date() -> Parser<NaiveDate> {
    Parser::new(
        |v| {
            let date_part = v.get(..10).unwrap_or(v);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
        },
        |v| v.format("%Y-%m-%d").to_string(),
    )
}

/// One of a fixed set of string literals; anything else parses to `None`.
#[must_use]
pub fn string_literal(values: &'static [&'static str]) -> Parser<&'static str> {
    Parser::new(
        move |v| values.iter().copied().find(|candidate| *candidate == v),
        |v| (*v).to_string(),
    )
}

/// One of a fixed set of numbers; anything else parses to `None`.
#[must_use]
pub fn number_literal(values: &'static [f64]) -> Parser<f64> {
    Parser::new(
        move |v| v.parse::<f64>().ok().filter(|n| values.contains(n)),
        f64::to_string,
    )
}

fn encode_separator(separator: char) -> String {
    utf8_percent_encode(&separator.to_string(), NON_ALPHANUMERIC).to_string()
}

/// A list of `item`-parsed values joined by `separator` into a single query
/// value (e.g. `?tags=1,2,3`).
///
/// Occurrences of the separator inside serialized items are percent-escaped,
/// so splitting on the separator is always unambiguous. The empty string
/// parses to an empty list; items that fail to parse are dropped.
///
/// # Panics
///
/// Panics if `item` is a multi-value parser; a setup error, not a runtime
/// condition.
#[must_use]
pub fn array_of<T: Send + Sync + 'static>(item: Parser<T>, separator: char) -> Parser<Vec<T>> {
    let (item_parse, item_serialize) = match &item.codec {
        Codec::Single { parse, serialize } => (parse.clone(), serialize.clone()),
        Codec::Multi { .. } => panic!("array_of requires a scalar item parser"),
    };
    let item_eq = item.eq.clone();
    let sep = separator.to_string();
    let encoded = encode_separator(separator);

    let parse = {
        let sep = sep.clone();
        let encoded = encoded.clone();
        move |query: &str| {
            if query.is_empty() {
                return Some(Vec::new());
            }
            Some(
                query
                    .split(separator)
                    .filter_map(|part| item_parse(&part.replace(&encoded, &sep)))
                    .collect(),
            )
        }
    };
    let serialize = move |values: &Vec<T>| {
        values
            .iter()
            .map(|value| item_serialize(value).replace(&sep, &encoded))
            .collect::<Vec<_>>()
            .join(&sep)
    };

    Parser {
        codec: Codec::Single {
            parse: Arc::new(parse),
            serialize: Arc::new(serialize),
        },
        eq: Arc::new(move |a: &Vec<T>, b: &Vec<T>| {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| item_eq(x, y))
        }),
        default: None,
        options: Options::default(),
    }
}

/// A list of `item`-parsed values carried as repeated same-named parameters
/// (e.g. `?tag=1&tag=2`). Items that fail to parse are dropped.
///
/// # Panics
///
/// Panics if `item` is a multi-value parser; a setup error, not a runtime
/// condition.
#[must_use]
pub fn repeated_array_of<T: Send + Sync + 'static>(item: Parser<T>) -> Parser<Vec<T>> {
    let (item_parse, item_serialize) = match &item.codec {
        Codec::Single { parse, serialize } => (parse.clone(), serialize.clone()),
        Codec::Multi { .. } => panic!("repeated_array_of requires a scalar item parser"),
    };
    let item_eq = item.eq.clone();

    Parser {
        codec: Codec::Multi {
            parse: Arc::new(move |items: &[String]| {
                Some(items.iter().filter_map(|item| item_parse(item)).collect())
            }),
            serialize: Arc::new(move |values: &Vec<T>| {
                values.iter().map(|value| item_serialize(value)).collect()
            }),
        },
        eq: Arc::new(move |a: &Vec<T>, b: &Vec<T>| {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| item_eq(x, y))
        }),
        default: None,
        options: Options::default(),
    }
}
