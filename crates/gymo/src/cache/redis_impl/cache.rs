//! Redis cache implementation.
//!
//! Uses set-based key tracking for scope deletion without SCAN. Every catalog
//! key is added to the `{type}:_keys` set of its entity type.
//!
//! # Atomicity
//!
//! `set` and `delete` send the value write and the tracking-set update in one
//! MULTI/EXEC block, so a value is never live without its tracking entry.
//! `delete_pattern` reads the tracking set first and then drops the matching
//! keys and their entries in one block. A key written after that read stays
//! tracked and is caught by the next scope deletion.
//!
//! Expired values still leave their name in the tracking set; DEL and SREM
//! on missing keys are no-ops.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use gymo_core::cache::{is_tracking_key, kind_from_key, pattern_matches, tracking_key, Cache, Result};

use super::error::map_redis_error;

/// Redis cache backend using connection manager for pooling.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();

        if let Some(kind) = kind_from_key(key).filter(|_| !is_tracking_key(key)) {
            pipe.sadd(tracking_key(kind), key).ignore();
        }
        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                pipe.set_ex(key, value, seconds).ignore();
            }
            None => {
                pipe.set(key, value).ignore();
            }
        }

        let (): () = pipe.query_async(&mut conn).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();

        if let Some(kind) = kind_from_key(key).filter(|_| !is_tracking_key(key)) {
            pipe.srem(tracking_key(kind), key).ignore();
        }
        pipe.del(key).ignore();

        let (): () = pipe.query_async(&mut conn).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        // Only type-scoped patterns are tracked
        let Some(kind) = kind_from_key(pattern) else {
            return Ok(());
        };

        let mut conn = self.conn.clone();
        let tracking = tracking_key(kind);

        let tracked_keys: Vec<String> = conn.smembers(&tracking).await.map_err(map_redis_error)?;

        let keys_to_delete: Vec<&String> = tracked_keys
            .iter()
            .filter(|k| pattern_matches(pattern, k))
            .collect();

        if keys_to_delete.is_empty() {
            return Ok(());
        }

        let (): () = redis::pipe()
            .atomic()
            .del(&keys_to_delete)
            .ignore()
            .srem(&tracking, &keys_to_delete)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }
}
