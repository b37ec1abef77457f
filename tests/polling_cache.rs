//! Lifecycle of `PollingCache`: startup failure, stale-over-unavailable,
//! periodic refresh, close and cancellation.

use anyhow::anyhow;
use search_controller::cache::{CacheError, PollingCache};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_secs(10);

fn interval_cache() -> PollingCache<String> {
    PollingCache::new("test", Some(INTERVAL)).unwrap()
}

/// Refresh function that returns `v<n>` on the n-th call, failing from call
/// `fail_from` onwards.
fn counting_refresh(
    calls: Arc<AtomicUsize>,
    fail_from: usize,
) -> impl Fn() -> futures::future::BoxFuture<'static, anyhow::Result<String>> + Send + Sync + 'static {
    move || {
        let calls = calls.clone();
        Box::pin(async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= fail_from {
                Err(anyhow!("upstream unavailable on call {n}"))
            } else {
                Ok(format!("v{n}"))
            }
        })
    }
}

#[tokio::test]
async fn startup_failure_reports_once_and_resets() {
    let cache = interval_cache();
    cache.set("unregistered", "kept until close".to_string());
    cache.register_refresh_fn("a", || async { Err::<String, _>(anyhow!("down")) });
    cache.register_refresh_fn("b", || async { Err::<String, _>(anyhow!("down")) });

    let (tx, mut rx) = mpsc::channel(4);
    cache.start_updates(CancellationToken::new(), tx).await;

    let err = rx.recv().await.expect("one startup error");
    assert!(matches!(err, CacheError::StartupRefresh { .. }));
    assert!(rx.recv().await.is_none(), "exactly one error is sent");

    assert!(cache.is_closed());
    assert!(cache.registered_keys().is_empty());
    for key in ["a", "b", "unregistered"] {
        assert_eq!(cache.get(key), Some(String::new()), "{key} reset to sentinel");
    }
}

#[tokio::test]
async fn partial_startup_failure_is_still_fatal() {
    let cache = interval_cache();
    cache.register_refresh_fn("good", || async { Ok("fine".to_string()) });
    cache.register_refresh_fn("bad", || async { Err::<String, _>(anyhow!("down")) });

    let (tx, mut rx) = mpsc::channel(4);
    cache.start_updates(CancellationToken::new(), tx).await;

    match rx.recv().await {
        Some(CacheError::StartupRefresh { key, .. }) => assert_eq!(key, "bad"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(cache.get("good"), Some(String::new()));
}

#[tokio::test(start_paused = true)]
async fn later_failures_keep_last_good_value() {
    let cache = interval_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    cache.register_refresh_fn("a", counting_refresh(calls.clone(), 2));

    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cache = cache.clone();
        let cancel = cancel.clone();
        async move { cache.start_updates(cancel, tx).await }
    });

    tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;

    assert!(calls.load(Ordering::SeqCst) >= 3, "refreshed on every tick");
    assert_eq!(cache.get("a").as_deref(), Some("v1"));
    assert!(rx.try_recv().is_err(), "periodic failures are not reported");
    assert!(!cache.is_closed());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn periodic_refresh_replaces_values() {
    let cache = interval_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    cache.register_refresh_fn("a", counting_refresh(calls.clone(), usize::MAX));

    let (tx, _rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cache = cache.clone();
        let cancel = cancel.clone();
        async move { cache.start_updates(cancel, tx).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(cache.get("a").as_deref(), Some("v1"));

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(cache.get("a").as_deref(), Some("v2"));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn close_stops_updates_and_resets() {
    let cache = interval_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    cache.register_refresh_fn("a", counting_refresh(calls.clone(), usize::MAX));

    let (tx, _rx) = mpsc::channel(1);
    let handle = tokio::spawn({
        let cache = cache.clone();
        async move { cache.start_updates(CancellationToken::new(), tx).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(cache.get("a").as_deref(), Some("v1"));

    cache.close();
    handle.await.unwrap();

    assert_eq!(cache.get("a"), Some(String::new()));
    assert!(cache.registered_keys().is_empty());

    let before = calls.load(Ordering::SeqCst);
    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(calls.load(Ordering::SeqCst), before, "no refresh after close");
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_loop_and_keeps_values() {
    let cache = interval_cache();
    cache.register_refresh_fn("a", || async { Ok("value".to_string()) });

    let (tx, _rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cache = cache.clone();
        let cancel = cancel.clone();
        async move { cache.start_updates(cancel, tx).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(cache.get("a").as_deref(), Some("value"));
    assert!(!cache.is_closed());
}

#[tokio::test]
async fn no_refresh_functions_returns_immediately() {
    let cache = interval_cache();
    let (tx, mut rx) = mpsc::channel(1);

    tokio::time::timeout(
        Duration::from_secs(1),
        cache.start_updates(CancellationToken::new(), tx),
    )
    .await
    .expect("returns without waiting for a tick");
    assert!(rx.recv().await.is_none());
}

#[test]
fn zero_interval_is_rejected() {
    let result = PollingCache::<String>::new("test", Some(Duration::ZERO));
    assert!(matches!(result, Err(CacheError::InvalidInterval(d)) if d.is_zero()));
}
