//! # Query Sync
//!
//! Typed, rate-limited synchronization between program state and URL query
//! strings.
//!
//! ## Architecture
//!
//! Every write funnels through one coalescing queue per engine scope:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Binding Layer                         │
//! │  • QueryStates / QueryState<T> over a declarative KeyMap   │
//! │  • Typed parsers serialize values, apply clear-on-default  │
//! │  • SyncBus broadcasts new values to sibling bindings       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Mutation Queues                         │
//! │  • DebounceController: per-key quiet windows               │
//! │  • ThrottledQueue: last-write-wins coalescing, one flush   │
//! │    per interval, shared FlushTicket                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                       (merged flush)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      URL Adapter                            │
//! │  • Host integration point (router bridge, TestAdapter)     │
//! │  • Reads SearchParams, applies the merged query string     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go the other way and read *through* the queues: a value queued but
//! not yet flushed is what every binding reports, so state is consistent
//! within a tick even though the URL lags behind the rate limit.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use query_sync::adapter::TestAdapter;
//! use query_sync::engine::{KeyMap, QueryEngine, Update};
//! use query_sync::options::Options;
//! use query_sync::parser::builtins::{integer, string};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let adapter = Arc::new(TestAdapter::new("?page=2"));
//!     let engine = QueryEngine::new(adapter.clone());
//!
//!     let states = engine.bind(
//!         KeyMap::new()
//!             .key("page", integer().with_default(0).erased())
//!             .key_as("search", "q", string().erased()),
//!         Options::new(),
//!     );
//!
//!     // Reads parse the live URL, applying defaults.
//!     assert_eq!(states.get::<i64>("page"), Some(2));
//!
//!     // Writes coalesce and flush through the rate limiter.
//!     let ticket = states
//!         .set(
//!             Update::new().set("page", 3_i64).set("search", "rust".to_string()),
//!             &Options::new(),
//!         )
//!         .unwrap();
//!     let search = ticket.wait().await.unwrap();
//!     assert_eq!(search.render(), "?page=3&q=rust");
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed Parsers**: composable parse/serialize/equality units with
//!   defaults, per-key options, and multi-value support
//! - **Write Coalescing**: last write wins per URL key within a flush cycle
//! - **Rate Limiting**: trailing-edge throttle plus per-key debounce,
//!   tunable per call, per key, or per engine
//! - **Flush Tickets**: every caller in a cycle awaits the same outcome
//! - **Cross-Binding Sync**: writes broadcast synchronously before flushing
//! - **Bijectivity Checks**: test helpers that catch lossy custom parsers
//!
//! ## Configuration
//!
//! See [`QueryEngineConfig`] for engine-level defaults.
//!
//! ## Modules
//!
//! - [`engine`]: the [`QueryEngine`] scope and binding layer
//! - [`parser`]: typed parsers and the built-in set
//! - [`queue`]: throttle and debounce mutation queues
//! - [`sync`]: the cross-binding broadcast bus
//! - [`adapter`]: the host URL boundary and the in-memory test adapter
//! - [`search_params`]: ordered query-string multimap primitives
//! - [`options`]: layered option resolution
//! - [`testing`]: parser bijectivity checks

pub mod adapter;
pub mod config;
pub mod engine;
pub mod options;
pub mod parser;
pub mod queue;
pub mod search_params;
pub mod sync;
pub mod testing;

pub use adapter::{AdapterContext, AdapterError, TestAdapter, UrlAdapter};
pub use config::QueryEngineConfig;
pub use engine::{BindingError, KeyMap, QueryEngine, QueryState, QueryStates, StateMap, Update};
pub use options::{History, Options, UpdateOptions};
pub use parser::{ErasedParser, Parser, ParserKind};
pub use queue::{FlushError, FlushTicket, RateLimit, RateLimitMethod};
pub use search_params::{Query, SearchParams};
pub use sync::{SyncBus, SyncPayload, SyncSubscription};
