//! Cached category repository decorator.
//!
//! A category row embeds its menu and item ids, so every write here drops
//! the menu and item scopes as well as its own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gymo_core::cache::{detail_key, list_key, Cache};
use gymo_core::catalog::{Category, CategoryId, EntityKind, NewCategory, Visibility};
use gymo_core::storage::{CategoryRepository, Result};

use super::{invalidate, lookup, store};

/// Cached category repository decorator.
pub struct CachedCategoryRepository<R: ?Sized, C: ?Sized> {
    repository: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<R: ?Sized, C: ?Sized> CachedCategoryRepository<R, C> {
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }
}

#[async_trait]
impl<R, C> CategoryRepository for CachedCategoryRepository<R, C>
where
    R: CategoryRepository + ?Sized + 'static,
    C: Cache + ?Sized + 'static,
{
    async fn get_category_by_title(&self, title: &str) -> Result<Option<Category>> {
        self.repository.get_category_by_title(title).await
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let created = self.repository.create_category(category).await?;
        invalidate(self.cache.as_ref(), EntityKind::Category).await;
        tracing::debug!(
            category_id = created.id,
            title = %created.title,
            menus = created.menu_ids.len(),
            items = created.item_ids.len(),
            "Category created"
        );
        Ok(created)
    }

    async fn get_category(
        &self,
        id: CategoryId,
        visibility: Visibility,
    ) -> Result<Option<Category>> {
        if visibility == Visibility::Any {
            return self.repository.get_category(id, visibility).await;
        }

        let key = detail_key(EntityKind::Category, id);
        if let Some(category) = lookup::<Category, _>(self.cache.as_ref(), &key).await {
            return Ok(Some(category));
        }

        let category = self.repository.get_category(id, visibility).await?;
        if let Some(ref c) = category {
            store(self.cache.as_ref(), &key, c, self.ttl).await;
        }
        Ok(category)
    }

    async fn get_categories(
        &self,
        ids: &[CategoryId],
        visibility: Visibility,
    ) -> Result<Vec<Category>> {
        self.repository.get_categories(ids, visibility).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let key = list_key(EntityKind::Category);
        if let Some(categories) = lookup::<Vec<Category>, _>(self.cache.as_ref(), &key).await {
            return Ok(categories);
        }

        let categories = self.repository.list_categories().await?;
        store(self.cache.as_ref(), &key, categories.as_slice(), self.ttl).await;
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> Result<Category> {
        let updated = self.repository.update_category(category).await?;
        invalidate(self.cache.as_ref(), EntityKind::Category).await;
        tracing::debug!(category_id = updated.id, "Category updated");
        Ok(updated)
    }

    async fn soft_delete_category(&self, id: CategoryId, at: DateTime<Utc>) -> Result<()> {
        self.repository.soft_delete_category(id, at).await?;
        invalidate(self.cache.as_ref(), EntityKind::Category).await;
        tracing::debug!(category_id = id, "Category soft-deleted");
        Ok(())
    }

    async fn get_categories_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Category>> {
        self.repository.get_categories_deleted_before(cutoff).await
    }

    async fn purge_categories(&self, ids: &[CategoryId], cutoff: DateTime<Utc>) -> Result<u64> {
        let purged = self.repository.purge_categories(ids, cutoff).await?;
        if purged > 0 {
            invalidate(self.cache.as_ref(), EntityKind::Category).await;
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::cached::test_support::{FailingCache, MockCache};
    use crate::storage::InMemoryRepository;
    use gymo_core::catalog::NewItem;
    use gymo_core::storage::ItemRepository;

    fn new_category(title: &str) -> NewCategory {
        NewCategory {
            title: title.to_string(),
            description: None,
            menu_ids: vec![],
            item_ids: vec![],
        }
    }

    fn setup() -> (
        Arc<InMemoryRepository>,
        Arc<MockCache>,
        CachedCategoryRepository<InMemoryRepository, MockCache>,
    ) {
        let repo = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(MockCache::new());
        let cached =
            CachedCategoryRepository::new(repo.clone(), cache.clone(), Duration::from_secs(300));
        (repo, cache, cached)
    }

    #[tokio::test]
    async fn test_distinct_ids_get_distinct_entries() {
        let (_repo, _cache, cached) = setup();
        let mut ids = Vec::new();
        for title in ["One", "Two", "Three", "Four", "Five", "Six", "Seven"] {
            ids.push(cached.create_category(&new_category(title)).await.unwrap().id);
        }
        let (five, seven) = (ids[4], ids[6]);

        let first = cached.get_category(five, Visibility::Visible).await.unwrap().unwrap();
        let second = cached.get_category(seven, Visibility::Visible).await.unwrap().unwrap();

        assert_eq!(first.title, "Five");
        assert_eq!(second.title, "Seven");
    }

    #[tokio::test]
    async fn test_write_forces_next_read_to_repopulate() {
        let (_repo, cache, cached) = setup();
        let category = cached.create_category(&new_category("Grills")).await.unwrap();
        cached.get_category(category.id, Visibility::Visible).await.unwrap();
        let key = detail_key(EntityKind::Category, category.id);
        assert!(cache.contains(&key).await);

        let mut renamed = category.clone();
        renamed.title = "Charcoal Grills".to_string();
        cached.update_category(&renamed).await.unwrap();
        assert!(!cache.contains(&key).await);

        let fetched = cached
            .get_category(category.id, Visibility::Visible)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "Charcoal Grills");
        assert!(cache.contains(&key).await);
    }

    #[tokio::test]
    async fn test_category_write_drops_every_scope() {
        let (_repo, cache, cached) = setup();
        for kind in [EntityKind::Menu, EntityKind::Category, EntityKind::Item] {
            cache.put_raw(&list_key(kind), b"[]").await;
        }

        cached.create_category(&new_category("Soups")).await.unwrap();

        assert!(cache.data.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_cached() {
        let (repo, _cache, cached) = setup();
        cached.create_category(&new_category("Soups")).await.unwrap();
        assert_eq!(cached.list_categories().await.unwrap().len(), 1);

        // Bypasses the decorator, so the cached list is still served
        repo.create_category(&new_category("Swallow")).await.unwrap();

        assert_eq!(cached.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_releases_items_and_hides_row() {
        let (repo, _cache, cached) = setup();
        let category = cached.create_category(&new_category("Drinks")).await.unwrap();
        let item = repo
            .create_item(&NewItem {
                title: "Zobo".to_string(),
                description: None,
                price: None,
                category_id: Some(category.id),
            })
            .await
            .unwrap();

        cached.soft_delete_category(category.id, Utc::now()).await.unwrap();

        assert_eq!(
            cached.get_category(category.id, Visibility::Visible).await.unwrap(),
            None
        );
        let item = repo.get_item(item.id, Visibility::Visible).await.unwrap().unwrap();
        assert_eq!(item.category_id, None);
    }

    #[tokio::test]
    async fn test_failing_cache_does_not_break_reads_or_writes() {
        let repo = Arc::new(InMemoryRepository::new());
        let cached =
            CachedCategoryRepository::new(repo, Arc::new(FailingCache), Duration::from_secs(300));

        let category = cached.create_category(&new_category("Soups")).await.unwrap();

        assert_eq!(
            cached.get_category(category.id, Visibility::Visible).await.unwrap(),
            Some(category.clone())
        );
        assert_eq!(cached.list_categories().await.unwrap(), vec![category]);
    }
}
