//! Cached menu repository decorator.
//!
//! Wraps a `MenuRepository` implementation with cache-aside pattern.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gymo_core::cache::{detail_key, list_key, Cache};
use gymo_core::catalog::{EntityKind, Menu, MenuId, NewMenu, Visibility};
use gymo_core::storage::{MenuRepository, Result};

use super::{invalidate, lookup, store};

/// Cached menu repository decorator.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
pub struct CachedMenuRepository<R: ?Sized, C: ?Sized> {
    repository: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<R: ?Sized, C: ?Sized> CachedMenuRepository<R, C> {
    /// Creates a new cached menu repository.
    ///
    /// # Arguments
    ///
    /// * `repository` - The underlying repository to cache
    /// * `cache` - The cache implementation
    /// * `ttl` - Time-to-live for cached lists and rows
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl<R, C> MenuRepository for CachedMenuRepository<R, C>
where
    R: MenuRepository + ?Sized + 'static,
    C: Cache + ?Sized + 'static,
{
    async fn get_menu_by_title(&self, title: &str) -> Result<Option<Menu>> {
        self.repository.get_menu_by_title(title).await
    }

    async fn create_menu(&self, menu: &NewMenu) -> Result<Menu> {
        let created = self.repository.create_menu(menu).await?;
        invalidate(self.cache.as_ref(), EntityKind::Menu).await;
        tracing::debug!(menu_id = created.id, title = %created.title, "Menu created");
        Ok(created)
    }

    async fn get_menu(&self, id: MenuId, visibility: Visibility) -> Result<Option<Menu>> {
        if visibility == Visibility::Any {
            return self.repository.get_menu(id, visibility).await;
        }

        let key = detail_key(EntityKind::Menu, id);
        if let Some(menu) = lookup::<Menu, _>(self.cache.as_ref(), &key).await {
            return Ok(Some(menu));
        }

        let menu = self.repository.get_menu(id, visibility).await?;
        if let Some(ref m) = menu {
            store(self.cache.as_ref(), &key, m, self.ttl).await;
        }
        Ok(menu)
    }

    async fn get_menus(&self, ids: &[MenuId], visibility: Visibility) -> Result<Vec<Menu>> {
        self.repository.get_menus(ids, visibility).await
    }

    async fn list_menus(&self) -> Result<Vec<Menu>> {
        let key = list_key(EntityKind::Menu);
        if let Some(menus) = lookup::<Vec<Menu>, _>(self.cache.as_ref(), &key).await {
            return Ok(menus);
        }

        let menus = self.repository.list_menus().await?;
        store(self.cache.as_ref(), &key, menus.as_slice(), self.ttl).await;
        Ok(menus)
    }

    async fn update_menu(&self, menu: &Menu) -> Result<Menu> {
        let updated = self.repository.update_menu(menu).await?;
        invalidate(self.cache.as_ref(), EntityKind::Menu).await;
        tracing::debug!(menu_id = updated.id, "Menu updated");
        Ok(updated)
    }

    async fn soft_delete_menu(&self, id: MenuId, at: DateTime<Utc>) -> Result<()> {
        self.repository.soft_delete_menu(id, at).await?;
        invalidate(self.cache.as_ref(), EntityKind::Menu).await;
        tracing::debug!(menu_id = id, "Menu soft-deleted");
        Ok(())
    }

    async fn get_menus_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Menu>> {
        self.repository.get_menus_deleted_before(cutoff).await
    }

    async fn purge_menus(&self, ids: &[MenuId], cutoff: DateTime<Utc>) -> Result<u64> {
        let purged = self.repository.purge_menus(ids, cutoff).await?;
        if purged > 0 {
            invalidate(self.cache.as_ref(), EntityKind::Menu).await;
        }
        Ok(purged)
    }
}
