//! In-process cache with per-entry TTL, a size bound and a tag index.
//!
//! When a new key arrives at capacity, expired entries are reclaimed first and
//! then the oldest-inserted entry is evicted. Eviction follows insertion order,
//! not access recency. A write is never refused.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cache::pattern::KeyPattern;
use crate::cache::traits::{BackendStats, effective_ttl};
use crate::cache::{AppCache, CacheError};
use crate::config::settings::MemoryCacheConfig;

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
    seq: u64,
    tags: Vec<String>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Default)]
struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
    /// Insertion sequence -> key, oldest first.
    order: BTreeMap<u64, String>,
    tags: HashMap<String, HashSet<String>>,
    next_seq: u64,
    evictions: u64,
    expirations: u64,
}

impl MemoryStore {
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        for tag in &entry.tags {
            if let Some(members) = self.tags.get_mut(tag) {
                members.remove(key);
                if members.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
        Some(entry)
    }

    /// Look up a live entry, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&CacheEntry> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.remove_entry(key);
            self.expirations += 1;
            return None;
        }
        self.entries.get(key)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.remove_entry(&key);
        self.evictions += 1;
        Some(key)
    }

    fn insert(
        &mut self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        tags: &[String],
        max_size: usize,
        now: Instant,
    ) -> Result<(), CacheError> {
        let expires_at = now
            .checked_add(ttl)
            .ok_or(CacheError::InvalidTtl(ttl.as_secs()))?;

        // Overwrites take the newest position and never trigger eviction.
        if self.remove_entry(key).is_none() && self.entries.len() >= max_size {
            self.purge_expired(now);
            while self.entries.len() >= max_size {
                match self.evict_oldest() {
                    Some(evicted) => tracing::debug!(key = %evicted, "Evicted oldest cache entry"),
                    None => break,
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let mut unique_tags: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique_tags.contains(tag) {
                self.tags
                    .entry(tag.clone())
                    .or_default()
                    .insert(key.to_string());
                unique_tags.push(tag.clone());
            }
        }

        self.order.insert(seq, key.to_string());
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at,
                seq,
                tags: unique_tags,
            },
        );
        Ok(())
    }
}

/// In-memory cache with size limit and per-entry TTL.
pub struct MemoryCache {
    store: Mutex<MemoryStore>,
    max_size: usize,
    default_ttl: u64,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig, default_ttl: u64) -> Self {
        Self {
            store: Mutex::new(MemoryStore::default()),
            max_size: config.max_size.max(1),
            default_ttl,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryStore>, CacheError> {
        self.store
            .lock()
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut store = self.lock()?;
        Ok(store.purge_expired(Instant::now()))
    }

    /// Start the background sweep that purges expired entries every `period`.
    ///
    /// The task holds a weak reference, so it ends when the cache is dropped
    /// or when `shutdown` is cancelled.
    pub fn spawn_sweeper(
        cache: &Arc<MemoryCache>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(cache);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(cache) = weak.upgrade() else { break };
                        match cache.purge_expired() {
                            Ok(0) => {}
                            Ok(purged) => tracing::debug!(purged, "Swept expired cache entries"),
                            Err(e) => tracing::warn!(error = %e, "Cache sweep failed"),
                        }
                    }
                }
            }
            tracing::debug!("Cache sweeper stopped");
        })
    }
}

#[async_trait]
impl AppCache for MemoryCache {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut store = self.lock()?;
        Ok(store
            .live(key, Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
        tags: &[String],
    ) -> Result<(), CacheError> {
        let ttl = effective_ttl(ttl_seconds, self.default_ttl)?;
        let mut store = self.lock()?;
        store.insert(
            key,
            value,
            Duration::from_secs(ttl),
            tags,
            self.max_size,
            Instant::now(),
        )
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self.lock()?;
        store.remove_entry(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let mut store = self.lock()?;
        Ok(store.live(key, Instant::now()).is_some())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let pattern = KeyPattern::new(pattern)?;
        let mut store = self.lock()?;

        let matching: Vec<String> = store
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &matching {
            store.remove_entry(key);
        }
        Ok(matching.len())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let mut store = self.lock()?;
        let Some(members) = store.tags.remove(tag) else {
            return Ok(0);
        };

        let mut removed = 0;
        for key in &members {
            if store.remove_entry(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut store = self.lock()?;
        store.entries.clear();
        store.order.clear();
        store.tags.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        let store = self.lock()?;
        Ok(BackendStats {
            backend: self.kind(),
            entries: Some(store.entries.len() as u64),
            capacity: Some(self.max_size as u64),
            tags: Some(store.tags.len() as u64),
            evictions: store.evictions,
            expirations: store.expirations,
            connections: None,
            idle_connections: None,
        })
    }
}
