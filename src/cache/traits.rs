//! AppCache trait definition.

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::CacheError;

/// Point-in-time counters reported by a cache backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    /// Backend name ("memory", "redis", "noop")
    pub backend: &'static str,
    /// Number of live entries, when the backend can count them cheaply
    pub entries: Option<u64>,
    /// Maximum number of entries before eviction kicks in
    pub capacity: Option<u64>,
    /// Number of tag indexes currently tracked
    pub tags: Option<u64>,
    /// Entries evicted to make room for new keys
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Open connections in the pool (remote backends)
    pub connections: Option<u32>,
    /// Idle connections in the pool (remote backends)
    pub idle_connections: Option<u32>,
}

/// Trait for cache operations.
///
/// All cache backends must implement this trait to provide a unified interface.
/// Values are opaque bytes; typed access lives in [`crate::cache::CacheManager`].
#[async_trait]
pub trait AppCache: Send + Sync {
    /// Short backend name used in logs and stats.
    fn kind(&self) -> &'static str;

    /// Get a value from the cache. Expired entries are reported as a miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a value in the cache with optional TTL override.
    ///
    /// Every tag in `tags` records the key in that tag's index so it can be
    /// dropped later through [`AppCache::invalidate_tag`].
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
        tags: &[String],
    ) -> Result<(), CacheError>;

    /// Remove a value from the cache. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Check for a live entry, applying the same expiry rule as `get`.
    async fn has(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key matching a glob pattern. Returns the number removed.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError>;

    /// Remove every key registered under `tag`, then the tag itself.
    async fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError>;

    /// Clear all values from the cache.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Snapshot of backend counters.
    async fn stats(&self) -> Result<BackendStats, CacheError>;
}

/// Longest TTL any backend accepts (one year).
pub const MAX_TTL_SECONDS: u64 = 365 * 86_400;

/// Resolve the TTL for a write, rejecting zero and anything above
/// [`MAX_TTL_SECONDS`].
pub(crate) fn effective_ttl(ttl_seconds: Option<u64>, default_ttl: u64) -> Result<u64, CacheError> {
    let ttl = ttl_seconds.unwrap_or(default_ttl);
    if ttl == 0 || ttl > MAX_TTL_SECONDS {
        return Err(CacheError::InvalidTtl(ttl));
    }
    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_ttl() {
        assert_eq!(effective_ttl(None, 300).unwrap(), 300);
        assert_eq!(effective_ttl(Some(5), 300).unwrap(), 5);
        assert!(matches!(
            effective_ttl(Some(0), 300),
            Err(CacheError::InvalidTtl(0))
        ));
        assert!(effective_ttl(None, 0).is_err());
    }

    #[test]
    fn test_effective_ttl_upper_bound() {
        assert_eq!(
            effective_ttl(Some(MAX_TTL_SECONDS), 300).unwrap(),
            MAX_TTL_SECONDS
        );
        assert!(matches!(
            effective_ttl(Some(MAX_TTL_SECONDS + 1), 300),
            Err(CacheError::InvalidTtl(ttl)) if ttl == MAX_TTL_SECONDS + 1
        ));
        assert!(matches!(
            effective_ttl(Some(u64::MAX), 300),
            Err(CacheError::InvalidTtl(u64::MAX))
        ));
        assert!(effective_ttl(None, u64::MAX / 2).is_err());
    }
}
