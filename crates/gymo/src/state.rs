//! Application state.
//!
//! Holds the catalog service, the retention sweeper and the shutdown
//! broadcast. The store and the cache are built once here and injected into
//! everything that needs them; backend combinations are chosen by feature
//! flags.

use std::sync::Arc;

use tokio::sync::broadcast;

use gymo_core::cache::Cache;
use gymo_core::storage::{CategoryRepository, ItemRepository, MenuRepository};

use crate::config::Config;
use crate::service::CatalogService;
use crate::storage::cached::{CachedCategoryRepository, CachedItemRepository, CachedMenuRepository};
use crate::sweeper::RetentionSweeper;

// ============================================================================
// Compile-time feature validation
// ============================================================================

// Storage features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!("Cannot enable both 'sqlite' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'sqlite'");

// Cache features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!("Cannot enable both 'memory' and 'redis' cache features");

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!("Must enable exactly one cache feature: 'memory' or 'redis'");

/// Shared application state.
///
/// This is cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    /// Catalog operations over the cached repositories.
    pub service: CatalogService,
    /// Retention sweeper over the raw store.
    pub sweeper: RetentionSweeper,
    /// Shutdown signal sender for background tasks.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Wires one store and one cache into the service and the sweeper.
    ///
    /// Handlers go through the cached decorators; the sweeper gets the raw
    /// store and invalidates on its own.
    fn build<R>(store: Arc<R>, cache: Arc<dyn Cache>, config: &Config) -> Self
    where
        R: MenuRepository + CategoryRepository + ItemRepository + 'static,
    {
        let ttl = config.cache_ttl();
        let service = CatalogService::new(
            Arc::new(CachedMenuRepository::new(store.clone(), cache.clone(), ttl)),
            Arc::new(CachedCategoryRepository::new(store.clone(), cache.clone(), ttl)),
            Arc::new(CachedItemRepository::new(store.clone(), cache.clone(), ttl)),
            cache.clone(),
        );
        let sweeper = RetentionSweeper::new(
            store.clone(),
            store.clone(),
            store,
            cache,
            config.retention(),
            config.sweep_interval(),
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            service,
            sweeper,
            shutdown_tx,
        }
    }

    /// Subscribe to shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal background tasks to shut down.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// ============================================================================
// Factory functions for different backend combinations
// ============================================================================

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and in-memory cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries));
            tracing::info!(path = %config.sqlite_path, "Using SQLite storage with in-memory cache");

            Ok(Self::build(sqlite_repo, memory_cache, config))
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "redis"))]
mod sqlite_redis {
    use super::*;
    use crate::cache::RedisCache;
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let redis_cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            tracing::info!(path = %config.sqlite_path, "Using SQLite storage with Redis cache");

            Ok(Self::build(sqlite_repo, redis_cache, config))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and cache.
        /// Useful for development without any external dependencies.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let inmemory_repo = Arc::new(InMemoryRepository::new());
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries));
            tracing::info!("Using in-memory storage with in-memory cache");

            Ok(Self::build(inmemory_repo, memory_cache, config))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "redis"))]
mod inmemory_redis {
    use super::*;
    use crate::cache::RedisCache;
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and Redis cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let inmemory_repo = Arc::new(InMemoryRepository::new());
            let redis_cache = Arc::new(RedisCache::new(&config.redis_url).await?);
            tracing::info!("Using in-memory storage with Redis cache");

            Ok(Self::build(inmemory_repo, redis_cache, config))
        }
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory store and a HashMap cache, independent of enabled features.
    pub fn for_tests() -> Self {
        use crate::storage::cached::test_support::MockCache;
        use crate::storage::InMemoryRepository;

        Self::build(
            Arc::new(InMemoryRepository::new()),
            Arc::new(MockCache::new()),
            &Config::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_reaches_subscribers() {
        let state = AppState::for_tests();
        let mut first = state.subscribe_shutdown();
        let mut second = state.clone().subscribe_shutdown();

        state.signal_shutdown();

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_signal_without_subscribers_is_harmless() {
        let state = AppState::for_tests();
        state.signal_shutdown();
    }

    #[tokio::test]
    async fn test_service_and_sweeper_share_the_store() {
        use gymo_core::catalog::CreateMenuRequest;

        let state = AppState::for_tests();
        let menu = state
            .service
            .create_menu(CreateMenuRequest::new("Brunch"))
            .await
            .unwrap();
        state.service.delete_menu(menu.id).await.unwrap();

        // Far enough ahead that the deletion is past retention
        let later = chrono::Utc::now() + chrono::Duration::days(365);
        let report = state.sweeper.sweep(later).await;

        assert_eq!(report.menus, 1);
        assert!(state.service.inspect_menu(menu.id).await.is_err());
    }
}
