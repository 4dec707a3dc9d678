//! Redis cache implementation using bb8 connection pool.
//!
//! Keys are stored as `{key_prefix}:{cache_name}:{key}`. Tag indexes are Redis
//! sets stored as `{key_prefix}:{cache_name}#tag:{tag}` so that key patterns
//! never match them. Pattern invalidation walks the keyspace with `SCAN`;
//! its cost grows with the whole database, not just this cache, so callers
//! should pass specific prefixes.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};

use crate::cache::pattern::KeyPattern;
use crate::cache::traits::{BackendStats, effective_ttl};
use crate::cache::{AppCache, CacheError};
use crate::config::settings::RedisCacheConfig;

type RedisPool = Pool<Client>;

/// Redis-based cache with bb8 connection pool.
pub struct RedisCache {
    pool: RedisPool,
    key_prefix: String,
    default_ttl: u64,
    op_timeout: Duration,
    scan_count: usize,
}

impl RedisCache {
    /// Connect to Redis and verify the server answers `PING`.
    pub async fn new(
        config: &RedisCacheConfig,
        cache_name: &str,
        default_ttl: u64,
    ) -> Result<Self, CacheError> {
        let url = config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CacheError::Connection("Redis URL is not configured".to_string()))?;

        let client = Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let connect_timeout = Duration::from_secs(config.connection_timeout);

        let pool = tokio::time::timeout(
            connect_timeout,
            Pool::builder()
                .max_size(config.pool_size)
                .connection_timeout(connect_timeout)
                .build(client),
        )
        .await
        .map_err(|_| CacheError::Timeout {
            operation: "connect",
            after_ms: connect_timeout.as_millis() as u64,
        })?
        .map_err(|e| CacheError::Connection(e.to_string()))?;

        let cache = Self {
            pool,
            key_prefix: format!("{}:{}", config.key_prefix, cache_name),
            default_ttl,
            op_timeout: Duration::from_millis(config.operation_timeout_ms),
            scan_count: config.scan_count,
        };
        cache.ping().await?;

        tracing::info!(prefix = %cache.key_prefix, "Connected to Redis cache");
        Ok(cache)
    }

    fn prefixed_key(&self, key: &str) -> String {
        prefixed_key(&self.key_prefix, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        tag_key(&self.key_prefix, tag)
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    /// Bound a remote call by the configured operation timeout.
    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation,
                after_ms: self.op_timeout.as_millis() as u64,
            }),
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.timed("ping", async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let _: String = redis::cmd("PING")
                .query_async(&mut *conn_ref)
                .await
                .map_err(|e: RedisError| CacheError::Connection(e.to_string()))?;
            Ok(())
        })
        .await
    }

    /// Delete every key matching a Redis glob, one `SCAN` page at a time.
    async fn scan_and_delete(&self, glob: &str) -> Result<usize, CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let mut cursor: u64 = 0;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut *conn_ref)
                .await
                .map_err(|e: RedisError| CacheError::Operation(e.to_string()))?;

            if !keys.is_empty() {
                let deleted: usize = conn_ref
                    .del(&keys)
                    .await
                    .map_err(|e: RedisError| CacheError::Operation(e.to_string()))?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{}:{}", prefix, key)
}

fn tag_key(prefix: &str, tag: &str) -> String {
    format!("{}#tag:{}", prefix, tag)
}

/// Keep a tag set alive exactly as long as its longest-lived member.
///
/// `NX` gives a fresh set its first expiry; `GT` only ever extends it, since
/// `GT` alone treats a set without expiry as immortal. Needs Redis 7.0+.
fn push_tag_expiry(pipe: &mut redis::Pipeline, tag_key: &str, ttl: u64) {
    pipe.cmd("EXPIRE").arg(tag_key).arg(ttl).arg("NX").ignore();
    pipe.cmd("EXPIRE").arg(tag_key).arg(ttl).arg("GT").ignore();
}

#[async_trait]
impl AppCache for RedisCache {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let prefixed = self.prefixed_key(key);
        self.timed("get", async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let value: Option<Vec<u8>> = conn_ref
                .get(&prefixed)
                .await
                .map_err(|e: RedisError| CacheError::Operation(e.to_string()))?;
            Ok(value)
        })
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_seconds: Option<u64>,
        tags: &[String],
    ) -> Result<(), CacheError> {
        let ttl = effective_ttl(ttl_seconds, self.default_ttl)?;
        let prefixed = self.prefixed_key(key);

        let mut pipe = redis::pipe();
        pipe.atomic().set_ex(&prefixed, value, ttl).ignore();
        for tag in tags {
            let tag_key = self.tag_key(tag);
            pipe.sadd(&tag_key, &prefixed).ignore();
            push_tag_expiry(&mut pipe, &tag_key, ttl);
        }

        self.timed("set", async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            pipe.query_async::<()>(&mut *conn_ref)
                .await
                .map_err(|e| CacheError::Operation(e.to_string()))
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let prefixed = self.prefixed_key(key);
        self.timed("remove", async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            conn_ref
                .del::<_, ()>(&prefixed)
                .await
                .map_err(|e| CacheError::Operation(e.to_string()))
        })
        .await
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        let prefixed = self.prefixed_key(key);
        self.timed("has", async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let exists: bool = conn_ref
                .exists(&prefixed)
                .await
                .map_err(|e: RedisError| CacheError::Operation(e.to_string()))?;
            Ok(exists)
        })
        .await
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let pattern = KeyPattern::new(pattern)?;
        let glob = self.prefixed_key(&pattern.redis_glob());
        self.timed("invalidate_pattern", self.scan_and_delete(&glob))
            .await
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<usize, CacheError> {
        let tag_key = self.tag_key(tag);
        self.timed("invalidate_tag", async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;

            let members: Vec<String> = conn_ref
                .smembers(&tag_key)
                .await
                .map_err(|e: RedisError| CacheError::Operation(e.to_string()))?;

            let removed: usize = if members.is_empty() {
                0
            } else {
                conn_ref
                    .del(&members)
                    .await
                    .map_err(|e: RedisError| CacheError::Operation(e.to_string()))?
            };

            conn_ref
                .del::<_, ()>(&tag_key)
                .await
                .map_err(|e| CacheError::Operation(e.to_string()))?;

            Ok(removed)
        })
        .await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let entries = format!("{}:*", self.key_prefix);
        let tags = format!("{}#tag:*", self.key_prefix);
        self.timed("clear", async {
            self.scan_and_delete(&entries).await?;
            self.scan_and_delete(&tags).await?;
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        let state = self.pool.state();
        Ok(BackendStats {
            backend: self.kind(),
            connections: Some(state.connections),
            idle_connections: Some(state.idle_connections),
            ..Default::default()
        })
    }
}
