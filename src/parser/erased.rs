// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Type-erased parsers, so a key map can hold heterogeneous value types.
//!
//! Values travel through the binding engine as [`DynValue`] (`Arc<dyn Any>`);
//! the erased parser carries the downcasting closures. A failed downcast on
//! serialize surfaces as `None` and is reported by the binding engine as a
//! type-mismatch error, never a panic.

use std::any::Any;
use std::sync::Arc;

use super::{Parser, ParserKind};
use crate::options::Options;
use crate::search_params::Query;

/// A type-erased state value.
pub type DynValue = Arc<dyn Any + Send + Sync>;

/// A [`Parser`] with its value type erased behind [`DynValue`].
#[derive(Clone)]
pub struct ErasedParser {
    kind: ParserKind,
    parse_query: Arc<dyn Fn(&Query) -> Option<DynValue> + Send + Sync>,
    serialize: Arc<dyn Fn(&DynValue) -> Option<Query> + Send + Sync>,
    eq: Arc<dyn Fn(&DynValue, &DynValue) -> bool + Send + Sync>,
    default: Option<DynValue>,
    options: Options,
}

impl std::fmt::Debug for ErasedParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedParser")
            .field("kind", &self.kind)
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

impl ErasedParser {
    #[must_use]
    pub fn kind(&self) -> ParserKind {
        self.kind
    }

    #[must_use]
    pub fn parse_query(&self, query: &Query) -> Option<DynValue> {
        (self.parse_query)(query)
    }

    /// `None` when the value's concrete type does not match the parser.
    #[must_use]
    pub fn serialize(&self, value: &DynValue) -> Option<Query> {
        (self.serialize)(value)
    }

    /// False when either value's concrete type does not match the parser.
    #[must_use]
    pub fn eq(&self, a: &DynValue, b: &DynValue) -> bool {
        (self.eq)(a, b)
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&DynValue> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl<T: Clone + Send + Sync + 'static> Parser<T> {
    /// Erase the value type for storage in a key map.
    #[must_use]
    pub fn erased(self) -> ErasedParser {
        let kind = self.kind();
        let options = self.options.clone();
        let default = self
            .default
            .clone()
            .map(|v| Arc::new(v) as DynValue);

        let parser = Arc::new(self);
        let parse = {
            let parser = parser.clone();
            move |query: &Query| {
                parser
                    .parse_query(query)
                    .map(|v| Arc::new(v) as DynValue)
            }
        };
        let serialize = {
            let parser = parser.clone();
            move |value: &DynValue| {
                value
                    .downcast_ref::<T>()
                    .map(|v| parser.serialize_query(v))
            }
        };
        let eq = move |a: &DynValue, b: &DynValue| {
            match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => parser.eq(a, b),
                _ => false,
            }
        };

        ErasedParser {
            kind,
            parse_query: Arc::new(parse),
            serialize: Arc::new(serialize),
            eq: Arc::new(eq),
            default,
            options,
        }
    }
}

/// Downcast a [`DynValue`] to a concrete, cloneable type.
#[must_use]
pub(crate) fn downcast_value<T: Clone + 'static>(value: &DynValue) -> Option<T> {
    value.downcast_ref::<T>().cloned()
}
