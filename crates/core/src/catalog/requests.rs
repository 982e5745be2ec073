//! API request types for catalog operations.
//!
//! Following the Functional Core pattern, these are pure data types with no I/O.
//! Update requests use [`Patch`] for every field that can be cleared, so that
//! an omitted field, an explicit `null` and a value all mean different things.

use serde::{Deserialize, Serialize};

use super::types::{Category, CategoryId, Item, ItemId, Menu, MenuId, Price};
use crate::serde::{deserialize_optional_string, deserialize_patch, serialize_patch};

/// Three-state change to an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field omitted: leave the current value alone.
    #[default]
    Unchanged,
    /// Field sent as `null`: remove the current value.
    Clear,
    /// Field sent with a value: replace the current value.
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// Applies the patch to an optional slot.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Unchanged => {}
            Patch::Clear => *slot = None,
            Patch::Set(value) => *slot = Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unchanged => Patch::Unchanged,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

impl<T> Patch<Vec<T>> {
    /// An empty list empties the relation, exactly like `null`.
    pub fn normalize(self) -> Self {
        match self {
            Patch::Set(values) if values.is_empty() => Patch::Clear,
            other => other,
        }
    }
}

/// Request payload for creating a new menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuRequest {
    pub title: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

impl CreateMenuRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request payload for updating a menu.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub description: Patch<String>,
}

impl UpdateMenuRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Patch<String>) -> Self {
        self.description = description;
        self
    }

    /// Apply scalar updates to an existing menu.
    pub fn apply_to(self, menu: &mut Menu) {
        if let Some(title) = self.title {
            menu.title = title;
        }
        self.description.apply_to(&mut menu.description);
    }
}

/// Request payload for creating a new category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub title: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_ids: Option<Vec<MenuId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_ids: Option<Vec<ItemId>>,
}

impl CreateCategoryRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            menu_ids: None,
            item_ids: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_menus(mut self, menu_ids: Vec<MenuId>) -> Self {
        self.menu_ids = Some(menu_ids);
        self
    }

    pub fn with_items(mut self, item_ids: Vec<ItemId>) -> Self {
        self.item_ids = Some(item_ids);
        self
    }
}

/// Request payload for updating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub description: Patch<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub menu_ids: Patch<Vec<MenuId>>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub item_ids: Patch<Vec<ItemId>>,
}

impl UpdateCategoryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Patch<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_menus(mut self, menu_ids: Patch<Vec<MenuId>>) -> Self {
        self.menu_ids = menu_ids;
        self
    }

    pub fn with_items(mut self, item_ids: Patch<Vec<ItemId>>) -> Self {
        self.item_ids = item_ids;
        self
    }

    /// Splits the request into its relation patches and the scalar part.
    ///
    /// The scalar part is applied immediately; relations need resolving first.
    pub fn apply_scalars(
        self,
        category: &mut Category,
    ) -> (Patch<Vec<MenuId>>, Patch<Vec<ItemId>>) {
        if let Some(title) = self.title {
            category.title = title;
        }
        self.description.apply_to(&mut category.description);
        (self.menu_ids.normalize(), self.item_ids.normalize())
    }
}

/// Request payload for creating a new item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl CreateItemRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            price: None,
            category_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Request payload for updating an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub description: Patch<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub price: Patch<Price>,
    #[serde(
        default,
        deserialize_with = "deserialize_patch",
        serialize_with = "serialize_patch",
        skip_serializing_if = "Patch::is_unchanged"
    )]
    pub category_id: Patch<CategoryId>,
}

impl UpdateItemRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Patch<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_price(mut self, price: Patch<Price>) -> Self {
        self.price = price;
        self
    }

    pub fn with_category(mut self, category_id: Patch<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Applies scalar fields and returns the category patch for resolving.
    pub fn apply_scalars(self, item: &mut Item) -> Patch<CategoryId> {
        if let Some(title) = self.title {
            item.title = title;
        }
        self.description.apply_to(&mut item.description);
        self.price.apply_to(&mut item.price);
        self.category_id
    }
}
