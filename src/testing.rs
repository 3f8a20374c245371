// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bijectivity checks for custom parsers.
//!
//! A parser that is not a bijection over its domain loses state on reload:
//! a value serialized into the URL must parse back to an equal value, and a
//! URL value must survive a parse/serialize round trip. Call these from a
//! custom parser's tests.
//!
//! # Example
//!
//! ```
//! use query_sync::parser::builtins::integer;
//! use query_sync::testing::check_parser_round_trip;
//!
//! check_parser_round_trip(&integer(), "42", &42).unwrap();
//! ```

use thiserror::Error;

use crate::parser::Parser;
use crate::search_params::Query;

/// A failed bijectivity check, with the mismatch spelled out.
#[derive(Debug, Clone, Error)]
pub enum ParserCheckError {
    #[error("serialize-then-parse failed: serialized form {serialized:?} did not parse back")]
    SerializeThenParseFailed { serialized: Query },
    #[error("serialize-then-parse mismatch: {serialized:?} parsed to a value not equal to the input")]
    SerializeThenParseMismatch { serialized: Query },
    #[error("parse-then-serialize failed: input {input:?} did not parse")]
    ParseFailed { input: Query },
    #[error("parse-then-serialize mismatch: expected {expected:?}, got {actual:?}")]
    ParseThenSerializeMismatch { expected: Query, actual: Query },
}

/// Serialize `value`, parse the result, and require equality under the
/// parser's equality relation.
pub fn check_serialize_then_parse<T>(parser: &Parser<T>, value: &T) -> Result<(), ParserCheckError> {
    let serialized = parser.serialize_query(value);
    match parser.parse_query(&serialized) {
        None => Err(ParserCheckError::SerializeThenParseFailed { serialized }),
        Some(parsed) if parser.eq(&parsed, value) => Ok(()),
        Some(_) => Err(ParserCheckError::SerializeThenParseMismatch { serialized }),
    }
}

/// Parse `input`, serialize the result, and require the exact input back.
pub fn check_parse_then_serialize<T>(
    parser: &Parser<T>,
    input: impl Into<Query>,
) -> Result<(), ParserCheckError> {
    let input = input.into();
    let Some(parsed) = parser.parse_query(&input) else {
        return Err(ParserCheckError::ParseFailed { input });
    };
    let actual = parser.serialize_query(&parsed);
    if crate::search_params::compare_query(Some(&input), Some(&actual)) {
        Ok(())
    } else {
        Err(ParserCheckError::ParseThenSerializeMismatch {
            expected: input,
            actual,
        })
    }
}

/// Both directions at once: `input` must parse to a value equal to
/// `expected`, and `expected` must serialize back to `input`.
pub fn check_parser_round_trip<T>(
    parser: &Parser<T>,
    input: impl Into<Query>,
    expected: &T,
) -> Result<(), ParserCheckError> {
    let input = input.into();
    let Some(parsed) = parser.parse_query(&input) else {
        return Err(ParserCheckError::ParseFailed { input });
    };
    if !parser.eq(&parsed, expected) {
        let actual = parser.serialize_query(&parsed);
        return Err(ParserCheckError::ParseThenSerializeMismatch {
            expected: input,
            actual,
        });
    }
    check_serialize_then_parse(parser, expected)?;
    check_parse_then_serialize(parser, input)
}
