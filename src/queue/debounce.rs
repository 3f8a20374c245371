// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-key debounced queues layered over the throttle queue.
//!
//! A debounced write is held in its own per-key slot until the key has been
//! quiet for the requested window; each new write re-arms the timer and
//! discards the previous value. On expiry the update is handed to the shared
//! [`ThrottledQueue`] and flows through the normal flush path, so debounced
//! and throttled keys end up in the same URL mutation when they land
//! together.
//!
//! Every ticket handed out for a key during one debounce window resolves
//! with the outcome of the flush that finally carries the value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::throttle::{FlushOutcome, FlushTicket, PendingUpdate, ThrottledQueue};
use crate::adapter::AdapterContext;
use crate::search_params::Query;

struct Entry {
    queued: Option<PendingUpdate>,
    task: JoinHandle<()>,
    tx: watch::Sender<Option<FlushOutcome>>,
    rx: watch::Receiver<Option<FlushOutcome>>,
}

/// Holds one pending slot and timer per debounced URL key.
pub struct DebounceController {
    throttle: Arc<ThrottledQueue>,
    queues: Mutex<HashMap<String, Entry>>,
}

impl DebounceController {
    #[must_use]
    pub fn new(throttle: Arc<ThrottledQueue>) -> Self {
        Self {
            throttle,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Hold `update` until its key has been quiet for `time`, then hand it to
    /// the throttle queue and flush. Re-pushing the same key before expiry
    /// replaces the held value and restarts the timer; the earlier ticket
    /// still resolves with the eventual flush outcome.
    ///
    /// The adapter's rate-limit factor scales the quiet window as well as
    /// the throttle interval, so a test adapter with factor `0.0` fires
    /// debounced writes immediately.
    pub fn push(
        self: &Arc<Self>,
        update: PendingUpdate,
        time: Duration,
        ctx: &AdapterContext,
    ) -> FlushTicket {
        let url_key = update.url_key.clone();
        let mut queues = self.queues.lock();

        // Re-arm: keep the watch channel so earlier tickets stay live.
        let (tx, rx) = match queues.remove(&url_key) {
            Some(entry) => {
                entry.task.abort();
                (entry.tx, entry.rx)
            }
            None => watch::channel(None),
        };

        let factor = ctx.adapter.rate_limit_factor().max(0.0);
        let wait = time.mul_f64(factor);
        debug!(key = %url_key, wait_ms = wait.as_millis() as u64, "debouncing update");

        let task = {
            let controller = Arc::clone(self);
            let ctx = ctx.clone();
            let url_key = url_key.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                let update = {
                    let mut queues = controller.queues.lock();
                    match queues.get_mut(&url_key) {
                        Some(entry) => entry.queued.take(),
                        None => None,
                    }
                };
                let Some(update) = update else { return };
                controller.throttle.push(update, Duration::ZERO);
                let outcome = controller.throttle.flush(&ctx).wait().await;
                controller.queues.lock().remove(&url_key);
                let _ = tx.send(Some(outcome));
            })
        };

        queues.insert(
            url_key,
            Entry {
                queued: Some(update),
                task,
                tx,
                rx: rx.clone(),
            },
        );
        FlushTicket::pending(rx)
    }

    /// The pending intent for a key, looking at the debounce slot first and
    /// falling back to the shared throttle queue.
    #[must_use]
    pub fn queued_query(&self, url_key: &str) -> Option<Option<Query>> {
        if let Some(entry) = self.queues.lock().get(url_key) {
            if let Some(update) = &entry.queued {
                return Some(update.query.clone());
            }
        }
        self.throttle.queued_query(url_key)
    }

    /// Drop any held value for `url_key` and cancel its timer. Outstanding
    /// tickets resolve as aborted.
    pub fn abort(&self, url_key: &str) {
        if let Some(entry) = self.queues.lock().remove(url_key) {
            entry.task.abort();
            drop(entry.tx);
        }
    }

    /// Tear down every per-key queue.
    pub fn abort_all(&self) {
        let mut queues = self.queues.lock();
        for (_, entry) in queues.drain() {
            entry.task.abort();
            drop(entry.tx);
        }
    }

    /// True while `url_key` has a value waiting out its quiet window.
    #[must_use]
    pub fn is_pending(&self, url_key: &str) -> bool {
        self.queues
            .lock()
            .get(url_key)
            .is_some_and(|entry| entry.queued.is_some())
    }
}
