//! Cache layer with runtime-selected backends.
//!
//! Two backends implement [`AppCache`]:
//! - Memory cache (in-process, bounded, insertion-order eviction)
//! - Redis cache (shared, network-based)
//!
//! [`CacheManager`] sits in front of the selected backend and is what the
//! rest of the application uses.
//!
//! # Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "auto"  # or "memory" or "redis"
//! default_ttl_seconds = 300
//!
//! [cache.memory]
//! max_size = 1000
//! sweep_interval_seconds = 60
//!
//! [cache.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! operation_timeout_ms = 250
//! key_prefix = "market"
//!
//! [cache.seasonal]
//! policy = "fixed"  # or "multiplier"
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let key = CacheKeys::products_by_farm(&farm_id);
//! let options = CacheOptions::new().seasonal().tag(CacheTags::farm(&farm_id));
//! let products = cache
//!     .get_or_set(&key, &options, || repository.products_by_farm(&farm_id))
//!     .await?;
//! ```

mod error;
pub mod keys;
mod manager;
mod memory;
mod noop;
pub mod pattern;
mod redis;
pub mod seasonal;
mod traits;

pub use error::CacheError;
pub use keys::{CacheKeys, CacheTags, CacheTtl, KeyBuilder};
pub use manager::{CacheManager, CacheOptions, CacheStats};
pub use memory::MemoryCache;
pub use noop::NoOpCache;
pub use redis::RedisCache;
pub use seasonal::{Season, SeasonalTtlPolicy};
pub use traits::{AppCache, BackendStats, MAX_TTL_SECONDS};

// Re-export config types
pub use crate::config::settings::{
    CacheBackend, CacheConfig, MemoryCacheConfig, RedisCacheConfig, SeasonalConfig,
};
