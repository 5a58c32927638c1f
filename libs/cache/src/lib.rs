//! Read-through cache over Redis with the key conventions the list/detail
//! read paths rely on.
//!
//! Keys are namespaced per resource:
//!
//! - `<resource>:<id>`: detail entries
//! - `<resource>:list:<params>`: list pages
//! - `<resource>:stats:<params>`: aggregate counters
//!
//! The cache performs no automatic invalidation. Every write path (inline or
//! consumer-driven) owns calling [`Cache::invalidate`] and
//! [`Cache::invalidate_lists_for`] after a successful mutation.
//!
//! Cache-layer failures never fail a read: [`Cache::get_or_set`] falls back
//! to the loader when Redis is unreachable or holds a corrupt entry.

use std::future::Future;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Cache errors. Only surfaced by the invalidation methods; reads swallow
/// cache failures and fall back to the loader.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Shared read-through cache handle.
#[derive(Clone)]
pub struct Cache {
    redis: ConnectionManager,
}

impl Cache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// The detail key for a resource instance, e.g. `products:p1`.
    pub fn detail_key(resource: &str, id: &str) -> String {
        format!("{}:{}", resource, id)
    }

    /// Return the cached value for `key`, or run `loader`, store its result
    /// with `ttl_seconds` and return it.
    ///
    /// Loader errors propagate unchanged. Cache-layer errors (connection
    /// loss, corrupt entries, store failures) are logged and the loader's
    /// value is returned, so read paths keep functioning without the cache.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Corrupt cache entry, reloading");
                }
            },
            Ok(None) => {
                debug!(key = %key, "Cache miss");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to loader");
            }
        }

        let value = loader().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, ttl_seconds).await {
                    warn!(key = %key, error = %e, "Failed to store cache entry");
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache entry");
            }
        }

        Ok(value)
    }

    /// Remove the exact detail key for `id` under `resource`.
    pub async fn invalidate(&self, resource: &str, id: &str) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        let key = Self::detail_key(resource, id);

        let _: i64 = conn.del(&key).await?;

        debug!(key = %key, "Invalidated cache entry");
        Ok(())
    }

    /// Remove every key matching `pattern` (Redis glob syntax).
    ///
    /// Returns the number of keys removed. Uses cursor-based SCAN so large
    /// keyspaces are walked without blocking the broker.
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.redis.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: i64 = conn.del(&keys).await?;
                deleted += removed as u64;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = %deleted, "Deleted cache pattern");
        Ok(deleted)
    }

    /// Remove every list and stats entry for `resource`.
    ///
    /// This is the coherence contract for collection reads: call it in the
    /// same logical operation as any mutation of the underlying rows.
    pub async fn invalidate_lists_for(&self, resource: &str) -> Result<u64, CacheError> {
        let lists = self.delete_pattern(&format!("{}:list:*", resource)).await?;
        let stats = self.delete_pattern(&format!("{}:stats:*", resource)).await?;
        Ok(lists + stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_key() {
        assert_eq!(Cache::detail_key("products", "p1"), "products:p1");
        assert_eq!(
            Cache::detail_key("activity_logs", "0199aa"),
            "activity_logs:0199aa"
        );
    }
}
