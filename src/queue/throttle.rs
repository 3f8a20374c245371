// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The rate-limited update queue.
//!
//! Pending per-key writes are coalesced (last write wins per URL key) and
//! flushed to the adapter no more often than the effective interval. The
//! queue is a state machine, `Idle → Scheduled → Flushing → Idle`; a flush
//! already scheduled is never re-entered, and repeated [`ThrottledQueue::flush`]
//! calls share one [`FlushTicket`].
//!
//! Per-update options merge by widening: any pending update asking for
//! `history=push`, `scroll=true` or `shallow=false` wins for the whole cycle,
//! and the effective interval is the maximum requested.
//!
//! The pending map is cleared *before* the adapter call (optimistic reset):
//! a failed flush rejects the ticket and does not retry — a fresh write is
//! required to retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::rate_limiting::RateLimit;
use crate::adapter::AdapterContext;
use crate::options::{History, UpdateOptions};
use crate::search_params::{write, Query, SearchParams};

/// Why a flush ticket was rejected.
#[derive(Debug, Clone, Error)]
pub enum FlushError {
    /// The adapter's URL-mutation call failed. Pending updates were already
    /// cleared; a fresh write is required to retry.
    #[error("URL update failed: {0}")]
    Adapter(String),
    /// The queue was torn down before the flush could resolve.
    #[error("flush aborted")]
    Aborted,
}

/// Resolution of one flush cycle: the resulting query string, or the error.
pub type FlushOutcome = Result<SearchParams, FlushError>;

/// One buffered write: `query == None` requests deletion of the key.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub url_key: String,
    pub query: Option<Query>,
    pub options: UpdateOptions,
}

/// Queue state machine. A flush is scheduled at most once; gating is by
/// state, not locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Scheduled,
    Flushing,
}

/// Awaitable handle on a flush cycle. Cloneable; every holder observes the
/// same outcome. Resolves (never hangs) when the queue is aborted.
#[derive(Debug, Clone)]
pub struct FlushTicket {
    inner: TicketInner,
}

#[derive(Debug, Clone)]
enum TicketInner {
    Ready(FlushOutcome),
    Pending(watch::Receiver<Option<FlushOutcome>>),
}

impl FlushTicket {
    pub(crate) fn ready(outcome: FlushOutcome) -> Self {
        Self {
            inner: TicketInner::Ready(outcome),
        }
    }

    pub(crate) fn pending(rx: watch::Receiver<Option<FlushOutcome>>) -> Self {
        Self {
            inner: TicketInner::Pending(rx),
        }
    }

    /// Wait for the flush to resolve.
    pub async fn wait(self) -> FlushOutcome {
        match self.inner {
            TicketInner::Ready(outcome) => outcome,
            TicketInner::Pending(mut rx) => loop {
                if let Some(outcome) = rx.borrow_and_update().clone() {
                    return outcome;
                }
                if rx.changed().await.is_err() {
                    return Err(FlushError::Aborted);
                }
            },
        }
    }
}

struct Inner {
    /// Coalesced pending writes, insertion-ordered, one slot per URL key.
    pending: Vec<(String, Option<Query>)>,
    /// Bumped on every push; lets a finishing flush tell writes that landed
    /// mid-cycle apart from a pending map the adapter chose to retain.
    generation: u64,
    /// Widened per-cycle options.
    options: UpdateOptions,
    /// Effective interval: the max requested by any pending update.
    time: Duration,
    state: QueueState,
    last_flushed_at: Option<Instant>,
    reset_on_next_push: bool,
    flush_tx: Option<watch::Sender<Option<FlushOutcome>>>,
    flush_rx: Option<watch::Receiver<Option<FlushOutcome>>>,
    flush_task: Option<JoinHandle<()>>,
}

impl Inner {
    fn reset(&mut self) -> Vec<String> {
        let keys = self.pending.iter().map(|(k, _)| k.clone()).collect();
        self.pending.clear();
        self.options = UpdateOptions::default();
        self.time = RateLimit::default().time;
        keys
    }
}

/// The coalescing, rate-limited update queue.
///
/// One instance is owned per [`crate::engine::QueryEngine`] scope and shared
/// by every binding in it.
pub struct ThrottledQueue {
    inner: Mutex<Inner>,
}

impl Default for ThrottledQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottledQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: Vec::new(),
                generation: 0,
                options: UpdateOptions::default(),
                time: RateLimit::default().time,
                state: QueueState::Idle,
                last_flushed_at: None,
                reset_on_next_push: false,
                flush_tx: None,
                flush_rx: None,
                flush_task: None,
            }),
        }
    }

    /// Buffer an update. Last write wins per URL key within a flush cycle;
    /// options widen and the effective interval ratchets up.
    pub fn push(&self, update: PendingUpdate, time: Duration) {
        let mut inner = self.inner.lock();
        if inner.reset_on_next_push {
            inner.reset();
            inner.reset_on_next_push = false;
        }
        match inner
            .pending
            .iter_mut()
            .find(|(key, _)| *key == update.url_key)
        {
            Some(slot) => slot.1 = update.query,
            None => inner.pending.push((update.url_key.clone(), update.query)),
        }
        if update.options.history == History::Push {
            inner.options.history = History::Push;
        }
        if update.options.scroll {
            inner.options.scroll = true;
        }
        if !update.options.shallow {
            inner.options.shallow = false;
        }
        if time > inner.time {
            inner.time = time;
        }
        inner.generation = inner.generation.wrapping_add(1);
        debug!(
            key = %update.url_key,
            pending = inner.pending.len(),
            "queued update"
        );
    }

    /// The pending intent for a key: `Some(None)` means a queued deletion,
    /// outer `None` means nothing is queued.
    #[must_use]
    pub fn queued_query(&self, url_key: &str) -> Option<Option<Query>> {
        self.inner
            .lock()
            .pending
            .iter()
            .find(|(key, _)| key == url_key)
            .map(|(_, query)| query.clone())
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        self.inner.lock().state
    }

    /// Schedule a flush of the pending updates. Idempotent while a flush is
    /// `Scheduled` or `Flushing`: the same shared ticket is returned.
    ///
    /// Requires a tokio runtime context (the flush timer is a spawned task).
    pub fn flush(self: &Arc<Self>, ctx: &AdapterContext) -> FlushTicket {
        let mut inner = self.inner.lock();
        if let Some(rx) = &inner.flush_rx {
            return FlushTicket::pending(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        inner.flush_tx = Some(tx);
        inner.flush_rx = Some(rx.clone());
        inner.state = QueueState::Scheduled;
        let queue = Arc::clone(self);
        let ctx = ctx.clone();
        inner.flush_task = Some(tokio::spawn(async move {
            queue.run_flush(ctx).await;
        }));
        FlushTicket::pending(rx)
    }

    /// The in-flight flush ticket, or an immediately-ready ticket carrying a
    /// fresh snapshot when nothing is scheduled.
    #[must_use]
    pub fn pending_ticket(&self, ctx: &AdapterContext) -> FlushTicket {
        let rx = self.inner.lock().flush_rx.clone();
        match rx {
            Some(rx) => FlushTicket::pending(rx),
            None => FlushTicket::ready(Ok(ctx.snapshot())),
        }
    }

    async fn run_flush(self: Arc<Self>, ctx: AdapterContext) {
        let factor = ctx.adapter.rate_limit_factor().max(0.0);
        // Trailing edge: wait out the remainder of the effective interval,
        // re-checking after each sleep so interval raises take effect.
        loop {
            let wait = {
                let inner = self.inner.lock();
                let effective = inner.time.mul_f64(factor);
                match inner.last_flushed_at {
                    None => Duration::ZERO,
                    Some(last) => effective.saturating_sub(last.elapsed()),
                }
            };
            if wait.is_zero() {
                break;
            }
            tokio::time::sleep(wait).await;
        }

        let (items, options, generation) = {
            let mut inner = self.inner.lock();
            inner.state = QueueState::Flushing;
            inner.last_flushed_at = Some(Instant::now());
            let items = inner.pending.clone();
            let options = inner.options;
            let generation = inner.generation;
            // Optimistic reset: pending state is gone before the adapter
            // call, so a failed flush does not retry.
            if ctx.adapter.auto_reset_queue_on_update() {
                inner.reset();
            }
            (items, options, generation)
        };

        let outcome = if items.is_empty() {
            Ok(ctx.snapshot())
        } else {
            let mut search = ctx.snapshot();
            for (key, value) in &items {
                match value {
                    None => search.remove(key),
                    Some(query) => write(query, key, &mut search),
                }
            }
            if let Some(process) = &ctx.process_url_search_params {
                search = process(search);
            }
            match ctx.adapter.update_url(&search, &options) {
                Ok(()) => {
                    debug!(count = items.len(), query = %search, "flushed updates");
                    Ok(search)
                }
                Err(e) => {
                    warn!(error = %e, "URL update failed");
                    Err(FlushError::Adapter(e.to_string()))
                }
            }
        };

        let reschedule = {
            let mut inner = self.inner.lock();
            // A push that landed mid-flush must not be wiped by the next
            // one, and needs a cycle of its own. A pending map the adapter
            // merely retained (no auto reset) does not: re-flushing it here
            // would loop once per interval with no new writes.
            let pushed_mid_flush = inner.generation != generation;
            if outcome.is_ok() && !pushed_mid_flush {
                inner.reset_on_next_push = true;
            }
            if let Some(tx) = inner.flush_tx.take() {
                let _ = tx.send(Some(outcome));
            }
            inner.flush_rx = None;
            inner.flush_task = None;
            inner.state = QueueState::Idle;
            pushed_mid_flush && !inner.pending.is_empty()
        };
        if reschedule {
            let _ = self.flush(&ctx);
        }
    }

    /// Cancel any in-flight timer, discard pending updates, resolve any
    /// outstanding ticket (with an empty best-effort snapshot; no adapter is
    /// available here) and clear the retained option/interval overrides.
    pub fn abort(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        if let Some(task) = inner.flush_task.take() {
            task.abort();
        }
        if let Some(tx) = inner.flush_tx.take() {
            let _ = tx.send(Some(Ok(SearchParams::new())));
        }
        inner.flush_rx = None;
        inner.state = QueueState::Idle;
        inner.reset_on_next_push = false;
        inner.reset()
    }

    /// Explicit reset for test isolation: clears pending updates and
    /// retained overrides, returning the keys that were queued.
    pub fn reset(&self) -> Vec<String> {
        self.inner.lock().reset()
    }
}
