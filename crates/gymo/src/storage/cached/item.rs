//! Cached item repository decorator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gymo_core::cache::{detail_key, list_key, Cache};
use gymo_core::catalog::{EntityKind, Item, ItemId, NewItem, Visibility};
use gymo_core::storage::{ItemRepository, Result};

use super::{invalidate, lookup, store};

/// Cached item repository decorator.
///
/// Item writes also drop the category scope, since cached categories list
/// their item ids.
pub struct CachedItemRepository<R: ?Sized, C: ?Sized> {
    repository: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<R: ?Sized, C: ?Sized> CachedItemRepository<R, C> {
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl<R, C> ItemRepository for CachedItemRepository<R, C>
where
    R: ItemRepository + ?Sized + 'static,
    C: Cache + ?Sized + 'static,
{
    async fn get_item_by_title(&self, title: &str) -> Result<Option<Item>> {
        self.repository.get_item_by_title(title).await
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item> {
        let created = self.repository.create_item(item).await?;
        invalidate(self.cache.as_ref(), EntityKind::Item).await;
        tracing::debug!(item_id = created.id, title = %created.title, "Item created");
        Ok(created)
    }

    async fn get_item(&self, id: ItemId, visibility: Visibility) -> Result<Option<Item>> {
        if visibility == Visibility::Any {
            return self.repository.get_item(id, visibility).await;
        }

        let key = detail_key(EntityKind::Item, id);
        if let Some(item) = lookup::<Item, _>(self.cache.as_ref(), &key).await {
            return Ok(Some(item));
        }

        let item = self.repository.get_item(id, visibility).await?;
        if let Some(ref i) = item {
            store(self.cache.as_ref(), &key, i, self.ttl).await;
        }
        Ok(item)
    }

    async fn get_items(&self, ids: &[ItemId], visibility: Visibility) -> Result<Vec<Item>> {
        self.repository.get_items(ids, visibility).await
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let key = list_key(EntityKind::Item);
        if let Some(items) = lookup::<Vec<Item>, _>(self.cache.as_ref(), &key).await {
            return Ok(items);
        }

        let items = self.repository.list_items().await?;
        store(self.cache.as_ref(), &key, items.as_slice(), self.ttl).await;
        Ok(items)
    }

    async fn update_item(&self, item: &Item) -> Result<Item> {
        let updated = self.repository.update_item(item).await?;
        invalidate(self.cache.as_ref(), EntityKind::Item).await;
        tracing::debug!(
            item_id = updated.id,
            category_id = ?updated.category_id,
            "Item updated"
        );
        Ok(updated)
    }

    async fn soft_delete_item(&self, id: ItemId, at: DateTime<Utc>) -> Result<()> {
        self.repository.soft_delete_item(id, at).await?;
        invalidate(self.cache.as_ref(), EntityKind::Item).await;
        tracing::debug!(item_id = id, "Item soft-deleted");
        Ok(())
    }

    async fn get_items_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Item>> {
        self.repository.get_items_deleted_before(cutoff).await
    }

    async fn purge_items(&self, ids: &[ItemId], cutoff: DateTime<Utc>) -> Result<u64> {
        let purged = self.repository.purge_items(ids, cutoff).await?;
        if purged > 0 {
            invalidate(self.cache.as_ref(), EntityKind::Item).await;
        }
        Ok(purged)
    }
}
