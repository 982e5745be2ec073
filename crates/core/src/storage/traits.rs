use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::{
    Category, CategoryId, Item, ItemId, Menu, MenuId, NewCategory, NewItem, NewMenu, Visibility,
};

use super::Result;

/// Repository for menu operations.
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Gets a menu by title, including soft-deleted rows.
    async fn get_menu_by_title(&self, title: &str) -> Result<Option<Menu>>;

    /// Inserts a new menu and returns it with its assigned id.
    async fn create_menu(&self, menu: &NewMenu) -> Result<Menu>;

    /// Gets a menu by its ID.
    async fn get_menu(&self, id: MenuId, visibility: Visibility) -> Result<Option<Menu>>;

    /// Gets every menu among `ids` that passes `visibility`.
    async fn get_menus(&self, ids: &[MenuId], visibility: Visibility) -> Result<Vec<Menu>>;

    /// Lists visible menus ordered by id.
    async fn list_menus(&self) -> Result<Vec<Menu>>;

    /// Saves scalar fields. `category_ids` is derived and ignored.
    async fn update_menu(&self, menu: &Menu) -> Result<Menu>;

    /// Soft-deletes a menu and detaches it from every category.
    async fn soft_delete_menu(&self, id: MenuId, at: DateTime<Utc>) -> Result<()>;

    /// Gets menus soft-deleted strictly before `cutoff`.
    async fn get_menus_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Menu>>;

    /// Physically removes the given menus if they are still deleted before `cutoff`.
    async fn purge_menus(&self, ids: &[MenuId], cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Repository for category operations.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Gets a category by title, including soft-deleted rows.
    async fn get_category_by_title(&self, title: &str) -> Result<Option<Category>>;

    /// Inserts a category together with its menu links and item ownership.
    async fn create_category(&self, category: &NewCategory) -> Result<Category>;

    /// Gets a category by its ID.
    async fn get_category(
        &self,
        id: CategoryId,
        visibility: Visibility,
    ) -> Result<Option<Category>>;

    /// Gets every category among `ids` that passes `visibility`.
    async fn get_categories(
        &self,
        ids: &[CategoryId],
        visibility: Visibility,
    ) -> Result<Vec<Category>>;

    /// Lists visible categories ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Saves scalar fields and replaces both relation sets in one transaction.
    async fn update_category(&self, category: &Category) -> Result<Category>;

    /// Soft-deletes a category, unlinks its menus and releases its items.
    async fn soft_delete_category(&self, id: CategoryId, at: DateTime<Utc>) -> Result<()>;

    /// Gets categories soft-deleted strictly before `cutoff`.
    async fn get_categories_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Category>>;

    /// Physically removes the given categories if they are still deleted before `cutoff`.
    async fn purge_categories(&self, ids: &[CategoryId], cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Repository for item operations.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Gets an item by title, including soft-deleted rows.
    async fn get_item_by_title(&self, title: &str) -> Result<Option<Item>>;

    /// Inserts a new item.
    async fn create_item(&self, item: &NewItem) -> Result<Item>;

    /// Gets an item by its ID.
    async fn get_item(&self, id: ItemId, visibility: Visibility) -> Result<Option<Item>>;

    /// Gets every item among `ids` that passes `visibility`.
    async fn get_items(&self, ids: &[ItemId], visibility: Visibility) -> Result<Vec<Item>>;

    /// Lists visible items ordered by id.
    async fn list_items(&self) -> Result<Vec<Item>>;

    /// Saves scalar fields and the owning category.
    async fn update_item(&self, item: &Item) -> Result<Item>;

    /// Soft-deletes an item.
    async fn soft_delete_item(&self, id: ItemId, at: DateTime<Utc>) -> Result<()>;

    /// Gets items soft-deleted strictly before `cutoff`.
    async fn get_items_deleted_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Item>>;

    /// Physically removes the given items if they are still deleted before `cutoff`.
    async fn purge_items(&self, ids: &[ItemId], cutoff: DateTime<Utc>) -> Result<u64>;
}
