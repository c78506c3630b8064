//! Geo Cache
//!
//! Results keyed by quantized coordinate, with in-flight deduplication and a
//! minimum interval between fetches. State lives in the cache object; there
//! is no process-global cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use auth::ClientResult;
use futures::future::{BoxFuture, FutureExt, Shared};
use platform::geo::{CoordKey, Coordinate};
use platform::rate_limit::RateWindow;
use tokio::time::Instant;

use crate::application::config::GeoCacheConfig;
use crate::error::{NearbyError, NearbyResult};

type SharedFetch<T> = Shared<BoxFuture<'static, NearbyResult<T>>>;

struct CacheEntry<T> {
    value: T,
    created_at: Instant,
}

struct InFlight<T> {
    id: u64,
    future: SharedFetch<T>,
}

struct State<T> {
    entries: HashMap<CoordKey, CacheEntry<T>>,
    in_flight: HashMap<CoordKey, InFlight<T>>,
    rate: RateWindow,
    next_id: u64,
}

struct Inner<T> {
    config: GeoCacheConfig,
    state: Mutex<State<T>>,
}

/// Geo-keyed cache for one query class
///
/// Cheap to clone; clones share entries, in-flight requests and the rate
/// window.
pub struct GeoCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for GeoCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> GeoCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(config: GeoCacheConfig) -> Self {
        let rate = RateWindow::new(config.min_interval);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    in_flight: HashMap::new(),
                    rate,
                    next_id: 0,
                }),
            }),
        }
    }

    pub fn config(&self) -> &GeoCacheConfig {
        &self.inner.config
    }

    pub fn key_for(&self, coordinate: &Coordinate) -> CoordKey {
        CoordKey::quantize(coordinate, self.inner.config.precision)
    }

    /// Look up `coordinate`, calling `fetcher` only when no fresh entry,
    /// pending request or rate-window fallback can answer.
    ///
    /// The fetch runs on its own task, so a caller giving up does not
    /// cancel it for the others.
    pub async fn get<F, Fut>(&self, coordinate: Coordinate, fetcher: F) -> NearbyResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        let key = self.key_for(&coordinate);

        let pending = {
            let mut state = self.lock();
            let now = Instant::now();
            let ttl = self.inner.config.ttl;

            if let Some(entry) = state
                .entries
                .get(&key)
                .filter(|e| now.saturating_duration_since(e.created_at) < ttl)
            {
                tracing::debug!(key = %key, "Geo cache hit");
                return Ok(entry.value.clone());
            }

            if let Some(in_flight) = state.in_flight.get(&key) {
                tracing::debug!(key = %key, "Joining in-flight lookup");
                in_flight.future.clone()
            } else {
                let window = state.rate.check(now);
                if !window.allowed {
                    if let Some(value) = Self::newest_fresh(&state, now, ttl) {
                        tracing::debug!(key = %key, "Rate limited, serving newest cached result");
                        return Ok(value);
                    }
                    tracing::warn!(
                        key = %key,
                        retry_after_ms = window.retry_after.as_millis() as u64,
                        "Nearby lookup rate limited"
                    );
                    return Err(NearbyError::RateLimited {
                        retry_after: window.retry_after,
                    });
                }

                state.next_id += 1;
                let id = state.next_id;
                let future = self.spawn_fetch(key, id, fetcher());
                state.in_flight.insert(
                    key,
                    InFlight {
                        id,
                        future: future.clone(),
                    },
                );
                tracing::debug!(key = %key, "Geo cache miss, fetching");
                future
            }
        };

        pending.await
    }

    /// Drop every cached entry. Pending lookups and the rate window are kept.
    pub fn invalidate(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_fetch<Fut>(&self, key: CoordKey, id: u64, fetch: Fut) -> SharedFetch<T>
    where
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = fetch.await.map_err(NearbyError::from);
            let now = Instant::now();

            let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
                state.in_flight.remove(&key);
            }
            match &result {
                Ok(value) => {
                    let ttl = inner.config.ttl;
                    state
                        .entries
                        .retain(|_, e| now.saturating_duration_since(e.created_at) < ttl);
                    state.entries.insert(
                        key,
                        CacheEntry {
                            value: value.clone(),
                            created_at: now,
                        },
                    );
                    state.rate.record_success(now);
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Nearby lookup failed");
                }
            }
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(NearbyError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }

    fn newest_fresh(state: &State<T>, now: Instant, ttl: std::time::Duration) -> Option<T> {
        state
            .entries
            .values()
            .filter(|e| now.saturating_duration_since(e.created_at) < ttl)
            .max_by_key(|e| e.created_at)
            .map(|e| e.value.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use auth::ClientError;
    use kernel::error::kind::ErrorKind;

    fn counted(
        calls: &Arc<AtomicU32>,
        value: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, ClientResult<String>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    fn failing(
        calls: &Arc<AtomicU32>,
    ) -> impl FnOnce() -> BoxFuture<'static, ClientResult<String>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Network {
                    message: "offline".into(),
                })
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_keys_hit_cache() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));

        let first = cache
            .get(Coordinate::new(30.26715, -97.74312), counted(&calls, "austin"))
            .await
            .unwrap();
        let second = cache
            .get(Coordinate::new(30.26717, -97.74309), counted(&calls, "other"))
            .await
            .unwrap();

        assert_eq!(first, "austin");
        assert_eq!(second, "austin");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_lookups_share_one_fetch() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let here = Coordinate::new(30.2672, -97.7431);

        let (a, b) = tokio::join!(
            cache.get(here, counted(&calls, "a")),
            cache.get(here, counted(&calls, "b")),
        );

        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_share_failure() {
        let cache = GeoCache::<String>::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let here = Coordinate::new(30.2672, -97.7431);

        let (a, b) = tokio::join!(
            cache.get(here, failing(&calls)),
            cache.get(here, failing(&calls))
        );

        assert_eq!(a.unwrap_err().kind(), ErrorKind::NetworkError);
        assert_eq!(b.unwrap_err().kind(), ErrorKind::NetworkError);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_key_within_interval_is_rate_limited() {
        let config = GeoCacheConfig {
            ttl: Duration::from_secs(5),
            ..Default::default()
        };
        let cache = GeoCache::new(config);
        let calls = Arc::new(AtomicU32::new(0));

        cache
            .get(Coordinate::new(30.2672, -97.7431), counted(&calls, "a"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        let err = cache
            .get(Coordinate::new(32.7767, -96.7970), counted(&calls, "b"))
            .await
            .unwrap_err();

        match err {
            NearbyError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(4));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_serves_newest_fresh_entry() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));

        cache
            .get(Coordinate::new(30.2672, -97.7431), counted(&calls, "austin"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        let value = cache
            .get(Coordinate::new(32.7767, -96.7970), counted(&calls, "dallas"))
            .await
            .unwrap();

        assert_eq!(value, "austin");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reopens_after_min_interval() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));

        cache
            .get(Coordinate::new(30.2672, -97.7431), counted(&calls, "austin"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;

        let value = cache
            .get(Coordinate::new(32.7767, -96.7970), counted(&calls, "dallas"))
            .await
            .unwrap();

        assert_eq!(value, "dallas");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_populates_neither_cache_nor_window() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let here = Coordinate::new(30.2672, -97.7431);

        assert!(cache.get(here, failing(&calls)).await.is_err());
        assert!(cache.is_empty());

        let value = cache.get(here, counted(&calls, "retry")).await.unwrap();
        assert_eq!(value, "retry");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let here = Coordinate::new(30.2672, -97.7431);

        cache.get(here, counted(&calls, "old")).await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(here, counted(&calls, "x")).await.unwrap(), "old");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(here, counted(&calls, "new")).await.unwrap(), "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // expired entry pruned on insert
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_drops_entries() {
        let cache = GeoCache::new(GeoCacheConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let here = Coordinate::new(30.2672, -97.7431);

        cache.get(here, counted(&calls, "a")).await.unwrap();
        cache.invalidate();
        assert!(cache.is_empty());

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.get(here, counted(&calls, "b")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
