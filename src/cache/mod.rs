//! Time-boxed in-process caches used by the search pipeline and the catalog.
//!
//! Backed by `moka`. Every entry carries its own time-to-live and is invisible
//! to lookups once `now - inserted_at >= ttl`. Expired entries are reclaimed by
//! moka's housekeeping, which [`TtlCache::sweep`] drives explicitly and
//! [`SearchCaches::spawn_sweeper`] runs on an interval. There is no size bound.


use moka::notification::RemovalCause;
use moka::sync::Cache;
use moka::Expiry;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::CacheConfig;
use crate::search::{ExpansionPolicy, FaqResult};

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    #[inline]
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    #[inline]
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

/// Expires each entry after its own `ttl`; overwriting restarts the clock.
struct PerEntryTtl;

impl<K, V> Expiry<K, CacheEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        entry: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Unbounded cache whose entries expire after a time-to-live.
pub struct TtlCache<K, V> {
    name: &'static str,
    default_ttl: Duration,
    inner: Cache<K, CacheEntry<V>>,
    expired: Arc<AtomicUsize>,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("default_ttl", &self.default_ttl)
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[inline]
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&expired);
        let inner = Cache::builder()
            .name(name)
            .expire_after(PerEntryTtl)
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Expired {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self {
            name,
            default_ttl,
            inner,
            expired,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return a clone of the cached value if it is still valid.
    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.inner.get(key)?;
        if entry.is_valid_at(Instant::now()) {
            Some(entry.data)
        } else {
            // moka keeps its own clock; the entry timestamp is authoritative
            self.inner.invalidate(key);
            debug!("{} cache entry expired", self.name);
            None
        }
    }

    #[inline]
    pub fn insert(&self, key: K, data: V) {
        self.insert_with_ttl(key, data, self.default_ttl);
    }

    #[inline]
    pub fn insert_with_ttl(&self, key: K, data: V, ttl: Duration) {
        self.inner.insert(key, CacheEntry::new(data, ttl));
    }

    /// Run pending housekeeping and return how many entries expired since the
    /// previous sweep.
    #[inline]
    pub fn sweep(&self) -> usize {
        self.inner.run_pending_tasks();
        self.expired.swap(0, Ordering::Relaxed)
    }

    /// Number of entries that are still valid.
    #[inline]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .iter()
            .filter(|(_, entry)| entry.is_valid_at(now))
            .count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }
}

/// Key for the results cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultsKey {
    pub query: String,
    pub limit: usize,
    pub policy: ExpansionPolicy,
}

impl ResultsKey {
    #[inline]
    pub fn new(query: &str, limit: usize, policy: ExpansionPolicy) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            limit,
            policy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepStats {
    pub embeddings: usize,
    pub results: usize,
    pub expansions: usize,
}

impl SweepStats {
    #[inline]
    pub fn total(&self) -> usize {
        self.embeddings + self.results + self.expansions
    }
}

/// The three caches shared by every search issued through one searcher.
#[derive(Debug)]
pub struct SearchCaches {
    pub embeddings: TtlCache<String, Vec<f32>>,
    pub results: TtlCache<ResultsKey, Vec<FaqResult>>,
    pub expansions: TtlCache<String, Vec<String>>,
    sweep_interval: Duration,
}

impl SearchCaches {
    #[inline]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            embeddings: TtlCache::new(
                "embedding",
                Duration::from_secs(config.embedding_ttl_secs),
            ),
            results: TtlCache::new("results", Duration::from_secs(config.results_ttl_secs)),
            expansions: TtlCache::new(
                "expansion",
                Duration::from_secs(config.expansion_ttl_secs),
            ),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    #[inline]
    pub fn sweep(&self) -> SweepStats {
        SweepStats {
            embeddings: self.embeddings.sweep(),
            results: self.results.sweep(),
            expansions: self.expansions.sweep(),
        }
    }

    #[inline]
    pub fn clear(&self) {
        self.embeddings.clear();
        self.results.clear();
        self.expansions.clear();
    }

    /// Start a background task sweeping all caches every `sweep_interval`.
    ///
    /// The task runs until the returned handle is aborted.
    #[inline]
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let caches = Arc::clone(self);
        let period = self.sweep_interval;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let stats = caches.sweep();
                if stats.total() > 0 {
                    debug!(
                        "Swept {} expired cache entries (embeddings: {}, results: {}, expansions: {})",
                        stats.total(),
                        stats.embeddings,
                        stats.results,
                        stats.expansions
                    );
                }
            }
        })
    }
}

impl Default for SearchCaches {
    #[inline]
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
