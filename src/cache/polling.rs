//! Key-value cache whose values are produced by registered refresh functions.
//!
//! Every registered key is refreshed once when [`PollingCache::start_updates`]
//! runs, then again on every tick of the optional refresh interval. Readers
//! only ever touch the live store and never wait on a refresh.
//!
//! Failure policy:
//! - a refresh error during the first pass is fatal: the error is sent to the
//!   caller's channel and the cache closes itself;
//! - a refresh error on a later tick is logged and the last good value kept.

use crate::utils::fmt_duration;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, join_all};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Produces a fresh value for one cache key.
pub type RefreshFn<V> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("refresh interval must be positive, got {0:?}")]
    InvalidInterval(Duration),
    #[error("initial refresh of cache key '{key}' failed")]
    StartupRefresh {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

struct Inner<V> {
    name: &'static str,
    store: DashMap<String, V>,
    /// Also serialises writes of refresh results against `close`.
    refreshers: Mutex<HashMap<String, RefreshFn<V>>>,
    interval: Option<Duration>,
    closed: CancellationToken,
}

/// Background-refreshed key-value store. Clone-cheap; clones share state.
///
/// `V::default()` is the empty sentinel. A registered key always has a value
/// in the store, starting with the sentinel until its first refresh succeeds.
pub struct PollingCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for PollingCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> PollingCache<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    /// Create an empty cache. `None` refreshes once at startup and never again;
    /// a zero interval is rejected.
    pub fn new(name: &'static str, interval: Option<Duration>) -> Result<Self, CacheError> {
        if let Some(interval) = interval
            && interval.is_zero()
        {
            return Err(CacheError::InvalidInterval(interval));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                name,
                store: DashMap::new(),
                refreshers: Mutex::new(HashMap::new()),
                interval,
                closed: CancellationToken::new(),
            }),
        })
    }

    fn refreshers(&self) -> MutexGuard<'_, HashMap<String, RefreshFn<V>>> {
        self.inner
            .refreshers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn interval(&self) -> Option<Duration> {
        self.inner.interval
    }

    /// Register (or replace) the refresh function for `key`. Call before
    /// [`start_updates`](Self::start_updates).
    pub fn register_refresh_fn<F, Fut>(&self, key: impl Into<String>, refresh: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let key = key.into();
        let refresh: RefreshFn<V> = Arc::new(move || refresh().boxed());
        self.refreshers().insert(key.clone(), refresh);
        self.inner.store.entry(key).or_default();
    }

    /// Current value for `key`, or `None` if it was never registered or set.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.store.get(key).map(|v| v.value().clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.store.insert(key.into(), value);
    }

    pub fn registered_keys(&self) -> Vec<String> {
        self.refreshers().keys().cloned().collect()
    }

    /// Keys currently held in the store.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Run every registered refresh function concurrently and store the
    /// successful results. Returns the failures.
    async fn refresh_all(&self) -> Vec<(String, anyhow::Error)> {
        let refreshers: Vec<(String, RefreshFn<V>)> = self
            .refreshers()
            .iter()
            .map(|(k, f)| (k.clone(), f.clone()))
            .collect();

        let start = Instant::now();
        let results = join_all(refreshers.into_iter().map(|(key, refresh)| async move {
            let result = refresh().await;
            (key, result)
        }))
        .await;

        let mut failures = Vec::new();
        let mut refreshed = 0usize;
        {
            // Hold the registry lock so a concurrent `close` cannot interleave.
            let _guard = self.refreshers();
            let closed = self.is_closed();
            for (key, result) in results {
                match result {
                    Ok(value) if !closed => {
                        self.inner.store.insert(key, value);
                        refreshed += 1;
                    }
                    Ok(_) => {}
                    Err(e) => failures.push((key, e)),
                }
            }
        }

        debug!(
            cache = self.inner.name,
            refreshed,
            failed = failures.len(),
            elapsed = fmt_duration(start.elapsed()),
            "Cache refresh pass complete"
        );
        failures
    }

    /// Refresh every key once, then keep refreshing on the configured interval
    /// until [`close`](Self::close) is called or `cancel` fires.
    ///
    /// If any refresh fails on the first pass, the first failure is sent to
    /// `errors`, the cache closes itself, and this returns.
    pub async fn start_updates(&self, cancel: CancellationToken, errors: mpsc::Sender<CacheError>) {
        if self.refreshers().is_empty() {
            debug!(cache = self.inner.name, "No refresh functions registered, nothing to update");
            return;
        }
        if let Err(e) = self.initial_refresh().await {
            if errors.send(e).await.is_err() {
                warn!(cache = self.inner.name, "Cache error receiver dropped");
            }
            return;
        }
        self.run_updates(cancel).await;
    }

    /// The first pass on its own: refresh every key once and wait for all of
    /// them. On failure the cache closes itself and the first error is returned.
    pub async fn initial_refresh(&self) -> Result<(), CacheError> {
        let mut failures = self.refresh_all().await;
        if failures.is_empty() {
            return Ok(());
        }
        let (key, source) = failures.swap_remove(0);
        error!(cache = self.inner.name, key = %key, error = ?source, "Initial cache refresh failed, closing cache");
        self.close();
        Err(CacheError::StartupRefresh { key, source })
    }

    /// The periodic part of [`start_updates`](Self::start_updates). Expects
    /// [`initial_refresh`](Self::initial_refresh) to have succeeded; returns at
    /// once for refresh-once or closed caches.
    pub async fn run_updates(&self, cancel: CancellationToken) {
        let name = self.inner.name;
        let Some(interval) = self.inner.interval else {
            info!(cache = name, "Cache populated, refresh interval not set");
            return;
        };
        if self.is_closed() || self.refreshers().is_empty() {
            debug!(cache = name, "Nothing to refresh periodically");
            return;
        }
        info!(cache = name, interval = fmt_duration(interval), "Cache populated, starting periodic refresh");

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.inner.closed.cancelled() => {
                    debug!(cache = name, "Cache closed, stopping updates");
                    break;
                }
                _ = cancel.cancelled() => {
                    debug!(cache = name, "Cache updates cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    for (key, e) in self.refresh_all().await {
                        warn!(cache = name, key = %key, error = ?e, "Cache refresh failed, keeping last value");
                    }
                }
            }
        }
    }

    /// Stop periodic updates, reset every stored value to the sentinel and
    /// clear the refresh registry.
    ///
    /// A cache created without an interval has no loop to stop, and `close`
    /// leaves it untouched.
    pub fn close(&self) {
        if self.inner.interval.is_none() {
            debug!(cache = self.inner.name, "Close on refresh-once cache ignored");
            return;
        }

        let mut refreshers = self.refreshers();
        self.inner.closed.cancel();
        for mut entry in self.inner.store.iter_mut() {
            *entry.value_mut() = V::default();
        }
        refreshers.clear();
        info!(cache = self.inner.name, "Cache closed");
    }
}
