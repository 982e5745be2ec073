//! Cached repository decorators.
//!
//! This module provides decorator implementations that wrap the repository
//! traits with caching behavior. The decorators implement the cache-aside
//! pattern:
//!
//! - **Reads**: visible lists and visible detail rows check the cache first;
//!   on miss they fetch from the repository and populate the cache
//! - **Lookups**: `Visibility::Any` reads, batch lookups, title lookups and
//!   retention queries always go to the repository
//! - **Writes**: persist to the repository, then drop every scope whose
//!   cached values the write can change
//!
//! Cache failures are logged and otherwise ignored.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let repo = Arc::new(SqliteRepository::new("gymo.db").await?);
//! let cache = Arc::new(MemoryCache::new(10_000));
//!
//! let menus = CachedMenuRepository::new(repo, cache, Duration::from_secs(300));
//! ```

mod category;
mod item;
mod menu;

pub use category::CachedCategoryRepository;
pub use item::CachedItemRepository;
pub use menu::CachedMenuRepository;

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use gymo_core::cache::{deserialize_value, invalidation_scopes, scope_pattern, serialize_value, Cache};
use gymo_core::catalog::EntityKind;

/// Reads and decodes a cached value. Any failure is a miss.
pub(crate) async fn lookup<T, C>(cache: &C, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    C: Cache + ?Sized,
{
    match cache.get(key).await {
        Ok(Some(bytes)) => match deserialize_value(&bytes) {
            Ok(value) => {
                tracing::trace!(key, "Cache hit");
                Some(value)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "Cached value could not be decoded");
                None
            }
        },
        Ok(None) => {
            tracing::trace!(key, "Cache miss");
            None
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "Cache read failed");
            None
        }
    }
}

/// Encodes and stores a value, logging failures.
pub(crate) async fn store<T, C>(cache: &C, key: &str, value: &T, ttl: Duration)
where
    T: Serialize + ?Sized,
    C: Cache + ?Sized,
{
    let bytes = match serialize_value(value) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(key, error = %err, "Failed to encode value for cache");
            return;
        }
    };
    if let Err(err) = cache.set(key, &bytes, Some(ttl)).await {
        tracing::warn!(key, error = %err, "Failed to populate cache");
    }
}

/// Drops every scope a write to `kind` can make stale.
pub(crate) async fn invalidate<C>(cache: &C, kind: EntityKind)
where
    C: Cache + ?Sized,
{
    for scope in invalidation_scopes(kind) {
        let pattern = scope_pattern(*scope);
        if let Err(err) = cache.delete_pattern(&pattern).await {
            tracing::warn!(pattern = %pattern, error = %err, "Failed to invalidate cache scope");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Caches shared by the decorator, service and sweeper tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use gymo_core::cache::{pattern_matches, Cache, CacheError, Result as CacheResult};

    /// HashMap-backed cache that counts pattern deletions.
    #[derive(Default)]
    pub struct MockCache {
        pub data: RwLock<HashMap<String, Vec<u8>>>,
        pub pattern_deletes: AtomicUsize,
    }

    impl MockCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn contains(&self, key: &str) -> bool {
            self.data.read().await.contains_key(key)
        }

        pub async fn put_raw(&self, key: &str, value: &[u8]) {
            self.data
                .write()
                .await
                .insert(key.to_string(), value.to_vec());
        }

        pub fn pattern_deletes(&self) -> usize {
            self.pattern_deletes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            Ok(self.data.read().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            self.put_raw(key, value).await;
            Ok(())
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.data.write().await.remove(key);
            Ok(())
        }

        async fn delete_pattern(&self, pattern: &str) -> CacheResult<()> {
            self.pattern_deletes.fetch_add(1, Ordering::SeqCst);
            self.data
                .write()
                .await
                .retain(|key, _| !pattern_matches(pattern, key));
            Ok(())
        }
    }

    /// A cache whose backend is unreachable.
    #[derive(Default)]
    pub struct FailingCache;

    fn unreachable() -> CacheError {
        CacheError::ConnectionFailed("connection refused".to_string())
    }

    #[async_trait]
    impl Cache for FailingCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(unreachable())
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            Err(unreachable())
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(unreachable())
        }

        async fn delete_pattern(&self, _pattern: &str) -> CacheResult<()> {
            Err(unreachable())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{FailingCache, MockCache};
    use super::*;
    use gymo_core::cache::{detail_key, list_key};

    #[tokio::test]
    async fn test_lookup_treats_garbage_as_miss() {
        let cache = MockCache::new();
        cache.put_raw("menu:list", b"not json").await;

        let value: Option<Vec<i64>> = lookup(&cache, "menu:list").await;

        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let cache = MockCache::new();
        store(&cache, "item:detail:3", &vec![1, 2], Duration::from_secs(60)).await;

        let value: Option<Vec<i64>> = lookup(&cache, "item:detail:3").await;

        assert_eq!(value, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_failing_cache_is_silent() {
        let cache = FailingCache;
        store(&cache, "menu:list", &vec![1], Duration::from_secs(60)).await;
        invalidate(&cache, EntityKind::Menu).await;

        let value: Option<Vec<i64>> = lookup(&cache, "menu:list").await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_related_scopes_only() {
        let cache = MockCache::new();
        for kind in [EntityKind::Menu, EntityKind::Category, EntityKind::Item] {
            cache.put_raw(&list_key(kind), b"[]").await;
            cache.put_raw(&detail_key(kind, 1), b"{}").await;
        }

        invalidate(&cache, EntityKind::Item).await;

        assert!(!cache.contains(&list_key(EntityKind::Item)).await);
        assert!(!cache.contains(&detail_key(EntityKind::Category, 1)).await);
        assert!(cache.contains(&list_key(EntityKind::Menu)).await);
        assert!(cache.contains(&detail_key(EntityKind::Menu, 1)).await);
        assert_eq!(cache.pattern_deletes(), 2);
    }
}
