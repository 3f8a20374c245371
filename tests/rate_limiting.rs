//! Integration Tests for Rate Limiting
//!
//! Timing-sensitive flows through the public API: throttle coalescing,
//! per-key debounce, mixed batches, and ticket resolution. The adapter's
//! rate-limit factor keeps windows short where wall-clock waits matter.
//!
//! # Test Organization
//! - `throttle_*` - Shared-queue coalescing and flush cadence
//! - `debounce_*` - Per-key quiet windows
//! - `ticket_*` - Flush ticket sharing and failure propagation

use std::sync::Arc;
use std::time::{Duration, Instant};

use query_sync::adapter::TestAdapter;
use query_sync::engine::{KeyMap, QueryEngine, QueryState, Update};
use query_sync::options::Options;
use query_sync::parser::builtins::{integer, string};
use query_sync::queue::{FlushError, RateLimit};

// =============================================================================
// Helpers
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine_with_factor(initial: &str, factor: f64) -> (Arc<TestAdapter>, QueryEngine) {
    init_tracing();
    let adapter = Arc::new(
        TestAdapter::new(initial)
            .with_memory()
            .with_rate_limit_factor(factor),
    );
    let engine = QueryEngine::new(adapter.clone());
    (adapter, engine)
}

fn page_map() -> KeyMap {
    KeyMap::new().key("page", integer().with_default(0).erased())
}

// =============================================================================
// Throttle Tests
// =============================================================================

#[tokio::test]
async fn throttle_same_tick_writes_coalesce_into_one_flush() {
    let (adapter, engine) = engine_with_factor("", 0.0);
    let states = engine.bind(page_map(), Options::new());

    states
        .set(Update::new().set("page", 1_i64), &Options::new())
        .unwrap();
    let ticket = states
        .set(Update::new().set("page", 2_i64), &Options::new())
        .unwrap();

    let search = ticket.wait().await.unwrap();
    assert_eq!(search.get("page"), Some("2"));
    assert_eq!(adapter.update_count(), 1);
    assert_eq!(adapter.last_query_string(), Some("?page=2".to_string()));
}

#[tokio::test]
async fn throttle_second_cycle_waits_out_the_window() {
    let (adapter, engine) = engine_with_factor("", 1.0);
    let states = engine.bind(page_map(), Options::new());
    let window = Duration::from_millis(60);
    let opts = Options::new().rate_limit(RateLimit::throttle(window));

    let started = Instant::now();
    states
        .set(Update::new().set("page", 1_i64), &opts)
        .unwrap()
        .wait()
        .await
        .unwrap();
    // First flush is immediate.
    assert!(started.elapsed() < window);

    states
        .set(Update::new().set("page", 2_i64), &opts)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(started.elapsed() >= window);
    assert_eq!(adapter.update_count(), 2);
}

#[tokio::test]
async fn throttle_zero_factor_flushes_immediately() {
    let (adapter, engine) = engine_with_factor("", 0.0);
    let states = engine.bind(page_map(), Options::new());
    let opts = Options::new().rate_limit(RateLimit::throttle(Duration::from_secs(60)));

    // A one-minute window with factor 0 must not block the test.
    states
        .set(Update::new().set("page", 1_i64), &opts)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(adapter.update_count(), 1);
}

// =============================================================================
// Debounce Tests
// =============================================================================

#[tokio::test]
async fn debounce_rapid_typing_collapses_to_final_value() {
    let (adapter, engine) = engine_with_factor("", 1.0);
    let search: QueryState<String> = engine.bind_key(
        "q",
        string()
            .with_options(Options::new().rate_limit(RateLimit::debounce(Duration::from_millis(10))))
            .erased(),
        Options::new(),
    );

    search.set("r".to_string()).unwrap();
    search.set("ru".to_string()).unwrap();
    let ticket = search.set("rust".to_string()).unwrap();

    let params = ticket.wait().await.unwrap();
    assert_eq!(params.get("q"), Some("rust"));
    assert_eq!(adapter.update_count(), 1);
}

#[tokio::test]
async fn debounce_held_value_is_readable_immediately() {
    let (adapter, engine) = engine_with_factor("", 1.0);
    let search: QueryState<String> = engine.bind_key(
        "q",
        string()
            .with_options(Options::new().rate_limit(RateLimit::debounce(Duration::from_secs(60))))
            .erased(),
        Options::new(),
    );

    search.set("draft".to_string()).unwrap();
    assert_eq!(search.get(), Some("draft".to_string()));
    assert_eq!(adapter.update_count(), 0);
    engine.reset_queues();
}

#[tokio::test]
async fn debounce_mixed_batch_flushes_throttled_keys_without_waiting() {
    let (adapter, engine) = engine_with_factor("", 1.0);
    let states = engine.bind(
        KeyMap::new()
            .key("page", integer().with_default(0).erased())
            .key(
                "q",
                string()
                    .with_options(
                        Options::new().rate_limit(RateLimit::debounce(Duration::from_secs(60))),
                    )
                    .erased(),
            ),
        Options::new(),
    );

    let ticket = states
        .set(
            Update::new()
                .set("page", 2_i64)
                .set("q", "held".to_string()),
            &Options::new(),
        )
        .unwrap();

    // The throttled key flushes now; the debounced key stays in its window.
    let params = ticket.wait().await.unwrap();
    assert_eq!(params.get("page"), Some("2"));
    assert!(!params.contains_key("q"));
    assert_eq!(adapter.update_count(), 1);
    // Both are already visible to reads.
    assert_eq!(states.get::<String>("q"), Some("held".to_string()));
    engine.reset_queues();
}

#[tokio::test]
async fn debounce_throttled_write_supersedes_pending_debounce() {
    let (adapter, engine) = engine_with_factor("", 1.0);
    let debounced = Options::new().rate_limit(RateLimit::debounce(Duration::from_secs(60)));
    let states = engine.bind(
        KeyMap::new().key("q", string().erased()),
        Options::new(),
    );

    states
        .set(Update::new().set("q", "slow".to_string()), &debounced)
        .unwrap();
    // An immediate write to the same key cancels the quiet window.
    let params = states
        .set(Update::new().set("q", "now".to_string()), &Options::new())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(params.get("q"), Some("now"));
    assert_eq!(adapter.update_count(), 1);
    assert_eq!(states.get::<String>("q"), Some("now".to_string()));
}

// =============================================================================
// Ticket Tests
// =============================================================================

#[tokio::test]
async fn ticket_all_writers_in_a_cycle_share_the_outcome() {
    let (adapter, engine) = engine_with_factor("", 0.0);
    let states = engine.bind(
        KeyMap::new()
            .key("a", integer().erased())
            .key("b", integer().erased()),
        Options::new(),
    );

    let t1 = states
        .set(Update::new().set("a", 1_i64), &Options::new())
        .unwrap();
    let t2 = states
        .set(Update::new().set("b", 2_i64), &Options::new())
        .unwrap();

    let (r1, r2) = tokio::join!(t1.wait(), t2.wait());
    let (p1, p2) = (r1.unwrap(), r2.unwrap());
    assert_eq!(p1, p2);
    assert_eq!(p1.get("a"), Some("1"));
    assert_eq!(p1.get("b"), Some("2"));
    assert_eq!(adapter.update_count(), 1);
}

#[tokio::test]
async fn ticket_adapter_failure_rejects_without_retry() {
    let (adapter, engine) = engine_with_factor("", 0.0);
    adapter.fail_next_update("host refused");
    let states = engine.bind(page_map(), Options::new());

    let err = states
        .set(Update::new().set("page", 1_i64), &Options::new())
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, FlushError::Adapter(_)));
    assert_eq!(adapter.update_count(), 0);

    // The queue recovered: a fresh write goes through.
    let params = states
        .set(Update::new().set("page", 2_i64), &Options::new())
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(params.get("page"), Some("2"));
    assert_eq!(adapter.update_count(), 1);
}

#[tokio::test]
async fn ticket_pending_resolves_ready_when_idle() {
    let (_, engine) = engine_with_factor("?page=4", 0.0);
    let params = engine.pending_ticket().wait().await.unwrap();
    assert_eq!(params.get("page"), Some("4"));
}

#[tokio::test]
async fn ticket_reset_queues_aborts_debounce_tickets() {
    let (adapter, engine) = engine_with_factor("", 1.0);
    let search: QueryState<String> = engine.bind_key(
        "q",
        string()
            .with_options(Options::new().rate_limit(RateLimit::debounce(Duration::from_secs(60))))
            .erased(),
        Options::new(),
    );

    let ticket = search.set("doomed".to_string()).unwrap();
    engine.reset_queues();
    assert!(matches!(ticket.wait().await, Err(FlushError::Aborted)));
    assert_eq!(adapter.update_count(), 0);
    assert_eq!(search.get(), None);
}
