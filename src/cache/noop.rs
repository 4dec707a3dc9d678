//! NoOp cache implementation.
//!
//! Used when caching is disabled. All operations are no-ops.

use async_trait::async_trait;

use crate::cache::traits::BackendStats;
use crate::cache::{AppCache, CacheError};

/// A no-operation cache that doesn't store anything.
///
/// Used when `cache.enabled = false` in configuration. Every read is a miss,
/// so `get_or_set` always reaches the fetcher.
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppCache for NoOpCache {
    fn kind(&self) -> &'static str {
        "noop"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        ttl_seconds: Option<u64>,
        _tags: &[String],
    ) -> Result<(), CacheError> {
        match ttl_seconds {
            Some(0) => Err(CacheError::InvalidTtl(0)),
            _ => Ok(()),
        }
    }

    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn has(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn invalidate_pattern(&self, _pattern: &str) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn invalidate_tag(&self, _tag: &str) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        Ok(BackendStats {
            backend: self.kind(),
            entries: Some(0),
            ..Default::default()
        })
    }
}
