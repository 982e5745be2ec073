//! Catalog operations and association rules.
//!
//! `CatalogService` is the only writer of catalog rows. It resolves every
//! referenced id against visible rows before anything is persisted, so a
//! relation write either attaches everything it names or nothing at all.

use std::sync::Arc;

use chrono::Utc;

use gymo_core::cache::{scope_pattern, Cache, Result as CacheResult};
use gymo_core::catalog::{
    distinct_ids, ensure_all_resolved, ensure_resolved, CatalogEntity, Category, CategoryId,
    CreateCategoryRequest, CreateItemRequest, CreateMenuRequest, EntityKind, Item, ItemId, Menu,
    MenuId, NewCategory, NewItem, NewMenu, Patch, UpdateCategoryRequest, UpdateItemRequest,
    UpdateMenuRequest, Visibility,
};
use gymo_core::storage::{
    CategoryRepository, ItemRepository, MenuRepository, RepositoryError, Result,
};

/// Fails with `NotFound` or `Deleted` unless the row can still be written.
fn ensure_writable<T: CatalogEntity>(id: i64, found: Option<T>) -> Result<T> {
    let entity_type = T::KIND.display_name();
    let Some(entity) = found else {
        return Err(RepositoryError::NotFound { entity_type, id });
    };
    if entity.lifecycle().is_deleted() {
        return Err(RepositoryError::Deleted { entity_type, id });
    }
    Ok(entity)
}

/// Fails with `NotFound` when a visible read found nothing.
fn ensure_found<T: CatalogEntity>(id: i64, found: Option<T>) -> Result<T> {
    found.ok_or(RepositoryError::NotFound {
        entity_type: T::KIND.display_name(),
        id,
    })
}

/// Fails with `Conflict` when `existing` holds the title for another row.
///
/// The lookup includes soft-deleted rows, matching the storage constraint.
fn ensure_title_free<T: CatalogEntity>(existing: Option<T>, own_id: Option<i64>) -> Result<()> {
    match existing {
        Some(other) if Some(other.id()) != own_id => {
            tracing::warn!(
                entity_type = T::KIND.display_name(),
                title = other.title(),
                "Rejected duplicate title"
            );
            Err(RepositoryError::Conflict {
                entity_type: T::KIND.display_name(),
                title: other.title().to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn log_rejection(err: &RepositoryError) {
    if let RepositoryError::RelationNotFound { relation, missing } = err {
        tracing::warn!(relation, missing = ?missing, "Rejected unresolved references");
    }
}

/// Menus, categories and items, with their association rules.
///
/// Repositories are normally the cached decorators; the cache handle is only
/// used for explicit scope clearing.
#[derive(Clone)]
pub struct CatalogService {
    menus: Arc<dyn MenuRepository>,
    categories: Arc<dyn CategoryRepository>,
    items: Arc<dyn ItemRepository>,
    cache: Arc<dyn Cache>,
}

impl CatalogService {
    pub fn new(
        menus: Arc<dyn MenuRepository>,
        categories: Arc<dyn CategoryRepository>,
        items: Arc<dyn ItemRepository>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            menus,
            categories,
            items,
            cache,
        }
    }

    // ------------------------------------------------------------------------
    // Relation resolution
    // ------------------------------------------------------------------------

    async fn resolve_menu_ids(&self, ids: &[MenuId]) -> Result<Vec<MenuId>> {
        let ids = distinct_ids(ids);
        let found = self.menus.get_menus(&ids, Visibility::Visible).await?;
        ensure_all_resolved("menuIds", &ids, &found).inspect_err(log_rejection)?;
        Ok(ids)
    }

    async fn resolve_item_ids(&self, ids: &[ItemId]) -> Result<Vec<ItemId>> {
        let ids = distinct_ids(ids);
        let found = self.items.get_items(&ids, Visibility::Visible).await?;
        ensure_all_resolved("itemIds", &ids, &found).inspect_err(log_rejection)?;
        Ok(ids)
    }

    async fn resolve_category_id(&self, id: CategoryId) -> Result<CategoryId> {
        let found = self.categories.get_categories(&[id], Visibility::Visible).await?;
        let category =
            ensure_resolved("categoryId", id, found.into_iter().next()).inspect_err(log_rejection)?;
        Ok(category.id)
    }

    /// Resolves a multi-valued relation patch against the current value.
    async fn resolve_menu_patch(
        &self,
        patch: Patch<Vec<MenuId>>,
        current: Vec<MenuId>,
    ) -> Result<Vec<MenuId>> {
        match patch {
            Patch::Unchanged => Ok(current),
            Patch::Clear => Ok(Vec::new()),
            Patch::Set(ids) => self.resolve_menu_ids(&ids).await,
        }
    }

    async fn resolve_item_patch(
        &self,
        patch: Patch<Vec<ItemId>>,
        current: Vec<ItemId>,
    ) -> Result<Vec<ItemId>> {
        match patch {
            Patch::Unchanged => Ok(current),
            Patch::Clear => Ok(Vec::new()),
            Patch::Set(ids) => self.resolve_item_ids(&ids).await,
        }
    }

    // ------------------------------------------------------------------------
    // Menus
    // ------------------------------------------------------------------------

    pub async fn create_menu(&self, request: CreateMenuRequest) -> Result<Menu> {
        let existing = self.menus.get_menu_by_title(&request.title).await?;
        ensure_title_free(existing, None)?;

        self.menus
            .create_menu(&NewMenu {
                title: request.title,
                description: request.description,
            })
            .await
    }

    pub async fn list_menus(&self) -> Result<Vec<Menu>> {
        self.menus.list_menus().await
    }

    pub async fn get_menu(&self, id: MenuId) -> Result<Menu> {
        let found = self.menus.get_menu(id, Visibility::Visible).await?;
        ensure_found(id, found)
    }

    /// Returns the row whatever its lifecycle state.
    pub async fn inspect_menu(&self, id: MenuId) -> Result<Menu> {
        let found = self.menus.get_menu(id, Visibility::Any).await?;
        ensure_found(id, found)
    }

    pub async fn update_menu(&self, id: MenuId, request: UpdateMenuRequest) -> Result<Menu> {
        let found = self.menus.get_menu(id, Visibility::Any).await?;
        let mut menu = ensure_writable(id, found)?;

        if let Some(title) = request.title.as_deref().filter(|t| *t != menu.title) {
            let existing = self.menus.get_menu_by_title(title).await?;
            ensure_title_free(existing, Some(id))?;
        }

        request.apply_to(&mut menu);
        self.menus.update_menu(&menu).await
    }

    /// Soft-deletes a menu and detaches it from its categories.
    pub async fn delete_menu(&self, id: MenuId) -> Result<()> {
        let found = self.menus.get_menu(id, Visibility::Any).await?;
        ensure_writable(id, found)?;
        self.menus.soft_delete_menu(id, Utc::now()).await
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    pub async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category> {
        let existing = self.categories.get_category_by_title(&request.title).await?;
        ensure_title_free(existing, None)?;

        let menu_ids = match request.menu_ids.as_deref() {
            Some(ids) if !ids.is_empty() => self.resolve_menu_ids(ids).await?,
            _ => Vec::new(),
        };
        let item_ids = match request.item_ids.as_deref() {
            Some(ids) if !ids.is_empty() => self.resolve_item_ids(ids).await?,
            _ => Vec::new(),
        };

        self.categories
            .create_category(&NewCategory {
                title: request.title,
                description: request.description,
                menu_ids,
                item_ids,
            })
            .await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.categories.list_categories().await
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        let found = self.categories.get_category(id, Visibility::Visible).await?;
        ensure_found(id, found)
    }

    /// Returns the row whatever its lifecycle state.
    pub async fn inspect_category(&self, id: CategoryId) -> Result<Category> {
        let found = self.categories.get_category(id, Visibility::Any).await?;
        ensure_found(id, found)
    }

    /// Applies scalar changes and the three-state `menuIds` / `itemIds` rules.
    ///
    /// Both relation sets are resolved before anything is written.
    pub async fn update_category(
        &self,
        id: CategoryId,
        request: UpdateCategoryRequest,
    ) -> Result<Category> {
        let found = self.categories.get_category(id, Visibility::Any).await?;
        let mut category = ensure_writable(id, found)?;

        if let Some(title) = request.title.as_deref().filter(|t| *t != category.title) {
            let existing = self.categories.get_category_by_title(title).await?;
            ensure_title_free(existing, Some(id))?;
        }

        let (menu_patch, item_patch) = request.apply_scalars(&mut category);
        let current_menus = std::mem::take(&mut category.menu_ids);
        let current_items = std::mem::take(&mut category.item_ids);
        category.menu_ids = self.resolve_menu_patch(menu_patch, current_menus).await?;
        category.item_ids = self.resolve_item_patch(item_patch, current_items).await?;

        self.categories.update_category(&category).await
    }

    /// Soft-deletes a category, unlinks its menus and releases its items.
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let found = self.categories.get_category(id, Visibility::Any).await?;
        ensure_writable(id, found)?;
        self.categories.soft_delete_category(id, Utc::now()).await
    }

    /// Drops every cached category list and detail entry.
    pub async fn clear_category_cache(&self) -> CacheResult<()> {
        self.cache
            .delete_pattern(&scope_pattern(EntityKind::Category))
            .await?;
        tracing::info!("Category cache cleared");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------------

    pub async fn create_item(&self, request: CreateItemRequest) -> Result<Item> {
        let existing = self.items.get_item_by_title(&request.title).await?;
        ensure_title_free(existing, None)?;

        let category_id = match request.category_id {
            Some(id) => Some(self.resolve_category_id(id).await?),
            None => None,
        };

        self.items
            .create_item(&NewItem {
                title: request.title,
                description: request.description,
                price: request.price,
                category_id,
            })
            .await
    }

    pub async fn list_items(&self) -> Result<Vec<Item>> {
        self.items.list_items().await
    }

    pub async fn get_item(&self, id: ItemId) -> Result<Item> {
        let found = self.items.get_item(id, Visibility::Visible).await?;
        ensure_found(id, found)
    }

    /// Returns the row whatever its lifecycle state.
    pub async fn inspect_item(&self, id: ItemId) -> Result<Item> {
        let found = self.items.get_item(id, Visibility::Any).await?;
        ensure_found(id, found)
    }

    pub async fn update_item(&self, id: ItemId, request: UpdateItemRequest) -> Result<Item> {
        let found = self.items.get_item(id, Visibility::Any).await?;
        let mut item = ensure_writable(id, found)?;

        if let Some(title) = request.title.as_deref().filter(|t| *t != item.title) {
            let existing = self.items.get_item_by_title(title).await?;
            ensure_title_free(existing, Some(id))?;
        }

        match request.apply_scalars(&mut item) {
            Patch::Unchanged => {}
            Patch::Clear => item.category_id = None,
            Patch::Set(category_id) => {
                item.category_id = Some(self.resolve_category_id(category_id).await?);
            }
        }

        self.items.update_item(&item).await
    }

    pub async fn delete_item(&self, id: ItemId) -> Result<()> {
        let found = self.items.get_item(id, Visibility::Any).await?;
        ensure_writable(id, found)?;
        self.items.soft_delete_item(id, Utc::now()).await
    }
}
