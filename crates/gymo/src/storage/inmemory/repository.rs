//! In-memory repository implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use gymo_core::catalog::{
    ensure_visible, is_expired, CatalogEntity, Category, CategoryId, EntityKind, Item, ItemId, Lifecycle, Menu,
    MenuId, NewCategory, NewItem, NewMenu, Visibility,
};
use gymo_core::storage::{
    CategoryRepository, ItemRepository, MenuRepository, RepositoryError, Result,
};

/// Every table behind one lock, so multi-table writes are atomic.
#[derive(Debug, Default)]
struct Tables {
    menus: BTreeMap<MenuId, Menu>,
    categories: BTreeMap<CategoryId, Category>,
    items: BTreeMap<ItemId, Item>,
    /// `(category_id, menu_id)` pairs.
    category_menus: BTreeSet<(CategoryId, MenuId)>,
    next_menu_id: MenuId,
    next_category_id: CategoryId,
    next_item_id: ItemId,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn menu_view(&self, menu: &Menu) -> Menu {
        let mut menu = menu.clone();
        menu.category_ids = self
            .category_menus
            .iter()
            .filter(|(_, menu_id)| *menu_id == menu.id)
            .map(|(category_id, _)| *category_id)
            .collect();
        menu
    }

    fn category_view(&self, category: &Category) -> Category {
        let mut category = category.clone();
        category.menu_ids = self
            .category_menus
            .iter()
            .filter(|(category_id, _)| *category_id == category.id)
            .map(|(_, menu_id)| *menu_id)
            .collect();
        category.item_ids = self
            .items
            .values()
            .filter(|item| item.category_id == Some(category.id) && !item.lifecycle.is_deleted())
            .map(|item| item.id)
            .collect();
        category
    }

    fn replace_category_links(&mut self, category_id: CategoryId, menu_ids: &[MenuId]) {
        self.category_menus.retain(|(c, _)| *c != category_id);
        self.category_menus
            .extend(menu_ids.iter().map(|menu_id| (category_id, *menu_id)));
    }

    fn replace_category_items(&mut self, category_id: CategoryId, item_ids: &[ItemId]) {
        for item in self.items.values_mut() {
            if item_ids.contains(&item.id) {
                item.category_id = Some(category_id);
            } else if item.category_id == Some(category_id) {
                item.category_id = None;
            }
        }
    }

    /// Checks a category's relation sets against the rows as they are now.
    fn ensure_category_refs(&self, menu_ids: &[MenuId], item_ids: &[ItemId]) -> Result<()> {
        ensure_visible("menuIds", menu_ids, |id| {
            self.menus.get(&id).is_some_and(|m| m.lifecycle.is_visible())
        })?;
        ensure_visible("itemIds", item_ids, |id| {
            self.items.get(&id).is_some_and(|i| i.lifecycle.is_visible())
        })
    }

    fn ensure_category_ref(&self, category_id: Option<CategoryId>) -> Result<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        ensure_visible("categoryId", &[category_id], |id| {
            self.categories
                .get(&id)
                .is_some_and(|c| c.lifecycle.is_visible())
        })
    }

    fn release_items(&mut self, category_id: CategoryId) {
        for item in self.items.values_mut() {
            if item.category_id == Some(category_id) {
                item.category_id = None;
            }
        }
    }
}

fn ensure_title_free<'a, T: CatalogEntity + 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    title: &str,
    except: Option<i64>,
) -> Result<()> {
    let taken = rows
        .into_iter()
        .any(|row| row.title() == title && Some(row.id()) != except);
    if taken {
        return Err(RepositoryError::Conflict {
            entity_type: T::KIND.display_name(),
            title: title.to_string(),
        });
    }
    Ok(())
}

fn not_found(kind: EntityKind, id: i64) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: kind.display_name(),
        id,
    }
}

/// Fails unless the row exists and has not been soft-deleted.
fn ensure_live(lifecycle: Option<&Lifecycle>, kind: EntityKind, id: i64) -> Result<()> {
    match lifecycle {
        None => Err(not_found(kind, id)),
        Some(lifecycle) if lifecycle.is_deleted() => Err(RepositoryError::Deleted {
            entity_type: kind.display_name(),
            id,
        }),
        Some(_) => Ok(()),
    }
}

fn mark_deleted(lifecycle: &mut Lifecycle, kind: EntityKind, id: i64, at: DateTime<Utc>) -> Result<()> {
    if lifecycle.is_deleted() {
        return Err(RepositoryError::Deleted {
            entity_type: kind.display_name(),
            id,
        });
    }
    lifecycle.soft_delete(at);
    Ok(())
}

/// In-memory storage backend.
///
/// Uses a single `Arc<RwLock<_>>` over all tables for thread-safe access.
/// Data is not persisted and will be lost when the repository is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MenuRepository for InMemoryRepository {
    async fn get_menu_by_title(&self, title: &str) -> Result<Option<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .find(|m| m.title == title)
            .map(|m| tables.menu_view(m)))
    }

    async fn create_menu(&self, menu: &NewMenu) -> Result<Menu> {
        let mut tables = self.tables.write().await;
        ensure_title_free(tables.menus.values(), &menu.title, None)?;

        let id = Tables::next_id(&mut tables.next_menu_id);
        let row = Menu {
            id,
            title: menu.title.clone(),
            description: menu.description.clone(),
            category_ids: Vec::new(),
            lifecycle: Lifecycle::new(Utc::now()),
        };
        tables.menus.insert(id, row.clone());
        Ok(row)
    }

    async fn get_menu(&self, id: MenuId, visibility: Visibility) -> Result<Option<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .get(&id)
            .filter(|m| m.lifecycle.matches(visibility))
            .map(|m| tables.menu_view(m)))
    }

    async fn get_menus(&self, ids: &[MenuId], visibility: Visibility) -> Result<Vec<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .filter(|m| ids.contains(&m.id) && m.lifecycle.matches(visibility))
            .map(|m| tables.menu_view(m))
            .collect())
    }

    async fn list_menus(&self) -> Result<Vec<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .filter(|m| m.lifecycle.is_visible())
            .map(|m| tables.menu_view(m))
            .collect())
    }

    async fn update_menu(&self, menu: &Menu) -> Result<Menu> {
        let mut tables = self.tables.write().await;
        ensure_live(
            tables.menus.get(&menu.id).map(|m| &m.lifecycle),
            EntityKind::Menu,
            menu.id,
        )?;
        ensure_title_free(tables.menus.values(), &menu.title, Some(menu.id))?;

        let row = tables
            .menus
            .get_mut(&menu.id)
            .ok_or_else(|| not_found(EntityKind::Menu, menu.id))?;
        row.title = menu.title.clone();
        row.description = menu.description.clone();
        row.lifecycle.is_active = menu.lifecycle.is_active;
        row.lifecycle.touch(Utc::now());

        let row = row.clone();
        Ok(tables.menu_view(&row))
    }

    async fn soft_delete_menu(&self, id: MenuId, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .menus
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityKind::Menu, id))?;
        mark_deleted(&mut row.lifecycle, EntityKind::Menu, id, at)?;
        tables.category_menus.retain(|(_, menu_id)| *menu_id != id);
        Ok(())
    }

    async fn get_menus_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Menu>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .filter(|m| is_expired(&m.lifecycle, cutoff))
            .map(|m| tables.menu_view(m))
            .collect())
    }

    async fn purge_menus(&self, ids: &[MenuId], cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.menus.len();
        tables
            .menus
            .retain(|id, m| !(ids.contains(id) && is_expired(&m.lifecycle, cutoff)));
        let purged = (before - tables.menus.len()) as u64;

        let Tables {
            menus,
            category_menus,
            ..
        } = &mut *tables;
        category_menus.retain(|(_, menu_id)| menus.contains_key(menu_id));
        Ok(purged)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn get_category_by_title(&self, title: &str) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.title == title)
            .map(|c| tables.category_view(c)))
    }

    async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let mut tables = self.tables.write().await;
        ensure_title_free(tables.categories.values(), &category.title, None)?;
        tables.ensure_category_refs(&category.menu_ids, &category.item_ids)?;

        let id = Tables::next_id(&mut tables.next_category_id);
        let row = Category {
            id,
            title: category.title.clone(),
            description: category.description.clone(),
            menu_ids: Vec::new(),
            item_ids: Vec::new(),
            lifecycle: Lifecycle::new(Utc::now()),
        };
        tables.categories.insert(id, row.clone());
        tables.replace_category_links(id, &category.menu_ids);
        tables.replace_category_items(id, &category.item_ids);

        Ok(tables.category_view(&row))
    }

    async fn get_category(
        &self,
        id: CategoryId,
        visibility: Visibility,
    ) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .get(&id)
            .filter(|c| c.lifecycle.matches(visibility))
            .map(|c| tables.category_view(c)))
    }

    async fn get_categories(
        &self,
        ids: &[CategoryId],
        visibility: Visibility,
    ) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .filter(|c| ids.contains(&c.id) && c.lifecycle.matches(visibility))
            .map(|c| tables.category_view(c))
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .filter(|c| c.lifecycle.is_visible())
            .map(|c| tables.category_view(c))
            .collect())
    }

    async fn update_category(&self, category: &Category) -> Result<Category> {
        let mut tables = self.tables.write().await;
        ensure_live(
            tables.categories.get(&category.id).map(|c| &c.lifecycle),
            EntityKind::Category,
            category.id,
        )?;
        ensure_title_free(tables.categories.values(), &category.title, Some(category.id))?;
        tables.ensure_category_refs(&category.menu_ids, &category.item_ids)?;

        let row = tables
            .categories
            .get_mut(&category.id)
            .ok_or_else(|| not_found(EntityKind::Category, category.id))?;
        row.title = category.title.clone();
        row.description = category.description.clone();
        row.lifecycle.is_active = category.lifecycle.is_active;
        row.lifecycle.touch(Utc::now());
        let row = row.clone();

        tables.replace_category_links(category.id, &category.menu_ids);
        tables.replace_category_items(category.id, &category.item_ids);

        Ok(tables.category_view(&row))
    }

    async fn soft_delete_category(&self, id: CategoryId, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityKind::Category, id))?;
        mark_deleted(&mut row.lifecycle, EntityKind::Category, id, at)?;
        tables.replace_category_links(id, &[]);
        tables.release_items(id);
        Ok(())
    }

    async fn get_categories_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .filter(|c| is_expired(&c.lifecycle, cutoff))
            .map(|c| tables.category_view(c))
            .collect())
    }

    async fn purge_categories(&self, ids: &[CategoryId], cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<CategoryId> = tables
            .categories
            .values()
            .filter(|c| ids.contains(&c.id) && is_expired(&c.lifecycle, cutoff))
            .map(|c| c.id)
            .collect();

        for id in &doomed {
            tables.categories.remove(id);
            tables.replace_category_links(*id, &[]);
            tables.release_items(*id);
        }
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl ItemRepository for InMemoryRepository {
    async fn get_item_by_title(&self, title: &str) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables.items.values().find(|i| i.title == title).cloned())
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item> {
        let mut tables = self.tables.write().await;
        ensure_title_free(tables.items.values(), &item.title, None)?;
        tables.ensure_category_ref(item.category_id)?;

        let id = Tables::next_id(&mut tables.next_item_id);
        let row = Item {
            id,
            title: item.title.clone(),
            description: item.description.clone(),
            price: item.price,
            category_id: item.category_id,
            lifecycle: Lifecycle::new(Utc::now()),
        };
        tables.items.insert(id, row.clone());
        Ok(row)
    }

    async fn get_item(&self, id: ItemId, visibility: Visibility) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(&id)
            .filter(|i| i.lifecycle.matches(visibility))
            .cloned())
    }

    async fn get_items(&self, ids: &[ItemId], visibility: Visibility) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| ids.contains(&i.id) && i.lifecycle.matches(visibility))
            .cloned()
            .collect())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| i.lifecycle.is_visible())
            .cloned()
            .collect())
    }

    async fn update_item(&self, item: &Item) -> Result<Item> {
        let mut tables = self.tables.write().await;
        ensure_live(
            tables.items.get(&item.id).map(|i| &i.lifecycle),
            EntityKind::Item,
            item.id,
        )?;
        ensure_title_free(tables.items.values(), &item.title, Some(item.id))?;
        tables.ensure_category_ref(item.category_id)?;

        let row = tables
            .items
            .get_mut(&item.id)
            .ok_or_else(|| not_found(EntityKind::Item, item.id))?;
        row.title = item.title.clone();
        row.description = item.description.clone();
        row.price = item.price;
        row.category_id = item.category_id;
        row.lifecycle.is_active = item.lifecycle.is_active;
        row.lifecycle.touch(Utc::now());
        Ok(row.clone())
    }

    async fn soft_delete_item(&self, id: ItemId, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityKind::Item, id))?;
        mark_deleted(&mut row.lifecycle, EntityKind::Item, id, at)
    }

    async fn get_items_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| is_expired(&i.lifecycle, cutoff))
            .cloned()
            .collect())
    }

    async fn purge_items(&self, ids: &[ItemId], cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.items.len();
        tables
            .items
            .retain(|id, i| !(ids.contains(id) && is_expired(&i.lifecycle, cutoff)));
        Ok((before - tables.items.len()) as u64)
    }
}
