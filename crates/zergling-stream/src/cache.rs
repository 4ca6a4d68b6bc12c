//! Time-windowed memoizing wrapper around an async fetch.
//!
//! Reads within `cache_time` of the last successful fetch are served from
//! memory. The state lock is held across the fetch, so concurrent readers
//! coalesce onto one fetch. A failed fetch is logged and the previous value
//! is returned; the timestamp is left alone so the next read retries.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::time::Instant;
use zergling_core::{ForceMode, Result};

/// Boxed fetch function shared by a cache.
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct CacheState<T> {
    last_value: Option<T>,
    last_fetch: Option<Instant>,
}

/// Memoizing cache over one data source.
pub struct Cache<T> {
    label: String,
    cache_time: Duration,
    fetch: FetchFn<T>,
    state: Mutex<CacheState<T>>,
    fetches: AtomicU64,
}

impl<T: Clone + Send + 'static> Cache<T> {
    /// Create a cache. `label` only shows up in logs.
    pub fn new<F, Fut>(label: &str, cache_time: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            label: label.to_string(),
            cache_time,
            fetch: Arc::new(move || fetch().boxed()),
            state: Mutex::new(CacheState {
                last_value: None,
                last_fetch: None,
            }),
            fetches: AtomicU64::new(0),
        }
    }

    /// Read the value, fetching when the window has passed.
    ///
    /// `ForceMode::Cache` serves the last value even when stale (and only
    /// fetches when there has never been one). `ForceMode::Fresh` always
    /// fetches. Returns `None` only when no fetch has ever succeeded.
    pub async fn get(&self, force: Option<ForceMode>) -> Option<T> {
        let mut state = self.state.lock().await;

        let is_fresh = state
            .last_fetch
            .is_some_and(|at| at.elapsed() < self.cache_time);
        if force != Some(ForceMode::Fresh) && (is_fresh || force == Some(ForceMode::Cache)) {
            if let Some(value) = &state.last_value {
                return Some(value.clone());
            }
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        match (self.fetch)().await {
            Ok(value) => {
                state.last_value = Some(value.clone());
                state.last_fetch = Some(Instant::now());
                Some(value)
            }
            Err(e) => {
                tracing::warn!(realm = %self.label, "Fetch failed, serving last value: {e}");
                state.last_value.clone()
            }
        }
    }

    /// Replace the cached value as if it had just been fetched.
    pub async fn prime(&self, value: T) {
        let mut state = self.state.lock().await;
        state.last_value = Some(value);
        state.last_fetch = Some(Instant::now());
    }

    /// Forget the timestamp so the next read fetches. The value is kept as
    /// a fallback for a failing fetch.
    pub async fn invalidate(&self) {
        self.state.lock().await.last_fetch = None;
    }

    /// Number of times the fetch function has been invoked.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn cache_time(&self) -> Duration {
        self.cache_time
    }
}
