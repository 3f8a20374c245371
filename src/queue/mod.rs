// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Rate-limited URL mutation queues.
//!
//! All writes funnel through one [`throttle::ThrottledQueue`] per engine
//! scope; keys opting into debouncing are staged first in a
//! [`debounce::DebounceController`]. [`rate_limiting::RateLimit`] names the
//! policy a write asks for.

pub mod debounce;
pub mod rate_limiting;
pub mod throttle;

pub use debounce::DebounceController;
pub use rate_limiting::{RateLimit, RateLimitMethod, DEFAULT_RATE_LIMIT_MS};
pub use throttle::{FlushError, FlushOutcome, FlushTicket, PendingUpdate, QueueState, ThrottledQueue};
