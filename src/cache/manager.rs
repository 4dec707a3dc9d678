//! Cache manager that dispatches to the configured backend.
//!
//! The manager is the only cache type callers see. It is built once during
//! bootstrap and cloned into whatever needs it. It adds typed access on top
//! of [`AppCache`], resolves seasonal TTLs, coalesces concurrent misses, and
//! fails open: a backend failure is logged and behaves like a miss, never
//! like an error on the caller's data path.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::cache::memory::MemoryCache;
use crate::cache::noop::NoOpCache;
use crate::cache::pattern::KeyPattern;
use crate::cache::redis::RedisCache;
use crate::cache::seasonal::{Season, SeasonalTtlPolicy};
use crate::cache::traits::{BackendStats, effective_ttl};
use crate::cache::{AppCache, CacheError};
use crate::config::settings::{CacheBackend, CacheConfig};

/// Per-write options for [`CacheManager::set_with`] and
/// [`CacheManager::get_or_set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// TTL in seconds; the configured default applies when unset.
    pub ttl: Option<u64>,
    /// Run the TTL through the seasonal policy for the current season.
    pub seasonal: bool,
    /// Tags the entry is registered under.
    pub tags: Vec<String>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn seasonal(mut self) -> Self {
        self.seasonal = true;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[derive(Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    fetches: AtomicU64,
    coalesced: AtomicU64,
    backend_errors: AtomicU64,
}

/// Manager-level counters combined with the backend snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    #[serde(flatten)]
    pub backend: BackendStats,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    /// Fetcher invocations made by `get_or_set`
    pub fetches: u64,
    /// `get_or_set` callers served by another caller's in-flight fetch
    pub coalesced: u64,
    /// Backend failures absorbed as misses or dropped writes
    pub backend_errors: u64,
    pub seasonal_policy: &'static str,
    pub season: Season,
}

/// Serialized result of the fetch a slot's leader ran, if it succeeded.
type Shared = Option<Vec<u8>>;

type InflightMap = DashMap<String, Arc<Mutex<Shared>>>;

/// Registration in the in-flight map for one `get_or_set` miss.
///
/// The first caller to take the lock fetches and leaves the encoded value in
/// the slot; later holders decode it without going back to the backend.
/// Dropping the slot removes the map entry once no other caller holds it,
/// including when the owning future is cancelled.
struct InflightSlot<'a> {
    map: &'a InflightMap,
    key: &'a str,
    lock: Arc<Mutex<Shared>>,
}

impl<'a> InflightSlot<'a> {
    fn join(map: &'a InflightMap, key: &'a str) -> Self {
        let lock = Arc::clone(map.entry(key.to_string()).or_default().value());
        Self { map, key, lock }
    }

    async fn acquire(&self) -> MutexGuard<'_, Shared> {
        self.lock.lock().await
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        // One reference in the map plus ours means nobody else is waiting.
        self.map
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

/// Cache manager that provides access to the configured cache backend.
#[derive(Clone)]
pub struct CacheManager {
    backend: Arc<dyn AppCache>,
    config: Arc<CacheConfig>,
    policy: Arc<SeasonalTtlPolicy>,
    inflight: Arc<InflightMap>,
    metrics: Arc<CacheMetrics>,
    shutdown: CancellationToken,
}

impl CacheManager {
    /// Create a new cache manager with the given configuration.
    ///
    /// If caching is disabled, a NoOpCache is used. With `backend = "auto"`
    /// Redis is used when a URL is configured and reachable; otherwise the
    /// in-process cache takes over.
    pub async fn new(config: CacheConfig, cache_name: &str) -> Result<Self, CacheError> {
        let shutdown = CancellationToken::new();
        let default_ttl = config.default_ttl_seconds;

        let backend: Arc<dyn AppCache> = if !config.enabled {
            Arc::new(NoOpCache::new())
        } else {
            match config.backend {
                CacheBackend::Memory => Self::memory_backend(&config, &shutdown),
                CacheBackend::Redis => {
                    Arc::new(RedisCache::new(&config.redis, cache_name, default_ttl).await?)
                }
                CacheBackend::Auto if config.redis.is_configured() => {
                    match RedisCache::new(&config.redis, cache_name, default_ttl).await {
                        Ok(redis) => Arc::new(redis),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                "Redis cache unavailable, falling back to in-process cache"
                            );
                            Self::memory_backend(&config, &shutdown)
                        }
                    }
                }
                CacheBackend::Auto => Self::memory_backend(&config, &shutdown),
            }
        };

        tracing::info!(
            backend = backend.kind(),
            default_ttl = default_ttl,
            seasonal_policy = ?config.seasonal.policy,
            "Cache initialized"
        );

        Ok(Self::from_parts(backend, config, shutdown))
    }

    /// Wrap an already constructed backend.
    pub fn with_backend(backend: Arc<dyn AppCache>, config: CacheConfig) -> Self {
        Self::from_parts(backend, config, CancellationToken::new())
    }

    fn from_parts(
        backend: Arc<dyn AppCache>,
        config: CacheConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let policy = SeasonalTtlPolicy::from_config(&config.seasonal);
        Self {
            backend,
            config: Arc::new(config),
            policy: Arc::new(policy),
            inflight: Arc::new(DashMap::new()),
            metrics: Arc::new(CacheMetrics::default()),
            shutdown,
        }
    }

    fn memory_backend(config: &CacheConfig, shutdown: &CancellationToken) -> Arc<dyn AppCache> {
        let memory = Arc::new(MemoryCache::new(&config.memory, config.default_ttl_seconds));
        MemoryCache::spawn_sweeper(
            &memory,
            std::time::Duration::from_secs(config.memory.sweep_interval_seconds),
            shutdown.child_token(),
        );
        memory
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &Arc<dyn AppCache> {
        &self.backend
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Check if caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn policy(&self) -> &SeasonalTtlPolicy {
        &self.policy
    }

    /// Stop background maintenance tasks.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn record_backend_error(&self, operation: &'static str, key: &str, error: &CacheError) {
        self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            backend = self.backend.kind(),
            operation,
            key,
            error = %error,
            "Cache backend error, continuing without cache"
        );
    }

    /// TTL for a write. Zero and oversized TTLs are rejected; seasonal writes
    /// go through the policy.
    fn resolve_ttl(&self, options: &CacheOptions) -> Result<u64, CacheError> {
        let base = effective_ttl(options.ttl, self.config.default_ttl_seconds)?;
        if options.seasonal {
            Ok(self.policy.ttl_for(Season::current(), base))
        } else {
            Ok(base)
        }
    }

    /// Read and decode without touching hit/miss counters.
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    if let Err(e) = self.backend.remove(key).await {
                        self.record_backend_error("remove", key, &e);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.record_backend_error("get", key, &e);
                None
            }
        }
    }

    /// Store encoded bytes. Backend failures are logged and swallowed.
    async fn write(&self, key: &str, bytes: Vec<u8>, ttl: u64, tags: &[String]) {
        match self.backend.set(key, bytes, Some(ttl), tags).await {
            Ok(()) => {
                self.metrics.writes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, ttl, "Cache write");
            }
            Err(e) => self.record_backend_error("set", key, &e),
        }
    }

    // ========================================================================
    // Typed operations
    // ========================================================================

    /// Get a value from the cache.
    ///
    /// Misses, expired entries, undecodable payloads and backend failures all
    /// return `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lookup(key).await;
        if value.is_some() {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Cache hit");
        } else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Cache miss");
        }
        value
    }

    /// Set a value in the cache.
    ///
    /// Fails only on caller mistakes: a zero TTL or a value that cannot be
    /// serialized. Backend failures are absorbed.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<(), CacheError> {
        let options = CacheOptions {
            ttl: ttl_seconds,
            ..Default::default()
        };
        self.set_with(key, value, &options).await
    }

    /// Set a value with explicit TTL, seasonal and tag options.
    pub async fn set_with<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &CacheOptions,
    ) -> Result<(), CacheError> {
        let ttl = self.resolve_ttl(options)?;
        let bytes = serde_json::to_vec(value)?;
        self.write(key, bytes, ttl, &options.tags).await;
        Ok(())
    }

    /// Set a value with the TTL the seasonal policy assigns to `season`.
    pub async fn set_seasonal<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        season: Season,
    ) -> Result<(), CacheError> {
        let ttl = self
            .policy
            .ttl_for(season, self.config.default_ttl_seconds);
        let bytes = serde_json::to_vec(value)?;
        self.write(key, bytes, ttl, &[]).await;
        Ok(())
    }

    /// Remove a value from the cache.
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            self.record_backend_error("remove", key, &e);
        }
    }

    /// Check for a live entry.
    pub async fn has(&self, key: &str) -> bool {
        match self.backend.has(key).await {
            Ok(found) => found,
            Err(e) => {
                self.record_backend_error("has", key, &e);
                false
            }
        }
    }

    /// Return the cached value, or run `fetcher`, cache its result and return it.
    ///
    /// Concurrent misses on the same key are coalesced: one caller runs the
    /// fetcher and the others receive its value directly, even when the
    /// backend could not store it. A fetcher error is returned unchanged,
    /// nothing is cached and the next waiter fetches in turn. If the result
    /// cannot be cached (invalid TTL, serialization failure, backend failure)
    /// it is still returned.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let slot = InflightSlot::join(&self.inflight, key);
        let mut shared = slot.acquire().await;

        if let Some(value) = shared
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
        {
            self.metrics.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Served by concurrent fetch");
            return Ok(value);
        }

        // A caller that finished before we joined may have filled the key.
        if let Some(value) = self.lookup(key).await {
            self.metrics.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Cache filled by concurrent fetch");
            return Ok(value);
        }

        self.metrics.fetches.fetch_add(1, Ordering::Relaxed);
        let value = fetcher().await?;

        let bytes = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(key, error = %e, "Fetched value is not serializable, not caching");
                return Ok(value);
            }
        };

        match self.resolve_ttl(options) {
            Ok(ttl) => self.write(key, bytes.clone(), ttl, &options.tags).await,
            Err(e) => tracing::warn!(key, error = %e, "Not caching fetched value"),
        }
        *shared = Some(bytes);

        Ok(value)
    }

    /// Remove every key matching a glob pattern (`*` and `?` wildcards).
    ///
    /// An empty pattern is rejected; backend failures count as zero removals.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        KeyPattern::new(pattern)?;
        match self.backend.invalidate_pattern(pattern).await {
            Ok(removed) => {
                tracing::debug!(pattern, removed, "Invalidated cache pattern");
                Ok(removed)
            }
            Err(e) => {
                self.record_backend_error("invalidate_pattern", pattern, &e);
                Ok(0)
            }
        }
    }

    /// Remove every entry registered under `tag`.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        match self.backend.invalidate_tag(tag).await {
            Ok(removed) => {
                tracing::debug!(tag, removed, "Invalidated cache tag");
                removed
            }
            Err(e) => {
                self.record_backend_error("invalidate_tag", tag, &e);
                0
            }
        }
    }

    /// Clear all values from the cache.
    pub async fn clear(&self) {
        match self.backend.clear().await {
            Ok(()) => tracing::info!(backend = self.backend.kind(), "Cache cleared"),
            Err(e) => self.record_backend_error("clear", "*", &e),
        }
    }

    /// Counters for observability. Never fails.
    pub async fn stats(&self) -> CacheStats {
        let backend = match self.backend.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                self.record_backend_error("stats", "", &e);
                BackendStats {
                    backend: self.backend.kind(),
                    ..Default::default()
                }
            }
        };

        CacheStats {
            backend,
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            writes: self.metrics.writes.load(Ordering::Relaxed),
            fetches: self.metrics.fetches.load(Ordering::Relaxed),
            coalesced: self.metrics.coalesced.load(Ordering::Relaxed),
            backend_errors: self.metrics.backend_errors.load(Ordering::Relaxed),
            seasonal_policy: self.policy.name(),
            season: Season::current(),
        }
    }
}
