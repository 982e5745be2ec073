//! In-memory cache implementation with LRU eviction.
//!
//! Provides a thread-safe in-memory cache with TTL support using
//! tokio synchronization primitives and LRU eviction policy.
//!
//! Mirrors the Redis backend: every catalog key is tracked under its entity
//! type, so dropping a scope such as `category:*` only touches that type's
//! keys.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use gymo_core::cache::{kind_from_key, pattern_matches, Cache, Result};
use gymo_core::catalog::EntityKind;

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// In-memory cache implementation with LRU eviction.
///
/// Thread-safe cache using `Arc<RwLock<LruCache>>` for concurrent access.
/// Expired entries are dropped lazily when they are next read.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    /// Main key-value store with LRU eviction.
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Live keys per entity type.
    tracking: Arc<RwLock<HashMap<EntityKind, HashSet<String>>>>,
}

impl MemoryCache {
    /// Creates a new in-memory cache with LRU eviction.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).expect("max_entries must be > 0");
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            tracking: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the entity type a pattern is confined to, if any.
    ///
    /// `category:*` is confined to categories; `*:list` is not.
    fn confined_kind(pattern: &str) -> Option<EntityKind> {
        let prefix = pattern.split(':').next()?;
        if prefix.contains('*') {
            return None;
        }
        kind_from_key(pattern)
    }
}

type Tracking = HashMap<EntityKind, HashSet<String>>;

fn track(tracking: &mut Tracking, key: &str) {
    if let Some(kind) = kind_from_key(key) {
        tracking.entry(kind).or_default().insert(key.to_string());
    }
}

fn untrack(tracking: &mut Tracking, key: &str) {
    let Some(kind) = kind_from_key(key) else {
        return;
    };
    if let Some(keys) = tracking.get_mut(&kind) {
        keys.remove(key);
        if keys.is_empty() {
            tracking.remove(&kind);
        }
    }
}

// Lock order is always `tracking`, then `store`. Any change to the set of
// live keys holds both, so the index never misses a live entry.
#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let mut store = self.store.write().await;
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        // Expired: re-check under both locks, a fresh `set` may have won
        let mut tracking = self.tracking.write().await;
        let mut store = self.store.write().await;
        if store.peek(key).is_some_and(CacheEntry::is_expired) {
            store.pop(key);
            untrack(&mut tracking, key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut tracking = self.tracking.write().await;
        let mut store = self.store.write().await;

        track(&mut tracking, key);
        let entry = CacheEntry::new(value.to_vec(), ttl);
        // `push` hands back the LRU victim, or the old entry when replacing
        if let Some((evicted, _)) = store.push(key.to_string(), entry) {
            if evicted != key {
                untrack(&mut tracking, &evicted);
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut tracking = self.tracking.write().await;
        let mut store = self.store.write().await;
        untrack(&mut tracking, key);
        store.pop(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut tracking = self.tracking.write().await;
        let mut store = self.store.write().await;

        let Some(kind) = Self::confined_kind(pattern) else {
            // Not confined to one type: O(n) scan of the whole store
            let keys: Vec<String> = store
                .iter()
                .filter(|(key, _)| pattern_matches(pattern, key))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &keys {
                store.pop(key);
                untrack(&mut tracking, key);
            }
            return Ok(());
        };

        let Some(keys) = tracking.get_mut(&kind) else {
            return Ok(());
        };
        let matching: Vec<String> = keys
            .iter()
            .filter(|k| pattern_matches(pattern, k))
            .cloned()
            .collect();
        for key in &matching {
            keys.remove(key);
            store.pop(key);
        }
        if keys.is_empty() {
            tracking.remove(&kind);
        }

        Ok(())
    }
}
