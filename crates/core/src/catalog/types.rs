use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MenuId = i64;
pub type CategoryId = i64;
pub type ItemId = i64;

/// Which rows a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only rows with `deleted_at` unset and `is_active` set.
    Visible,
    /// Every row, including soft-deleted ones.
    Any,
}

/// The three catalog entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Menu,
    Category,
    Item,
}

impl EntityKind {
    /// Lowercase name used as the cache key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Menu => "menu",
            EntityKind::Category => "category",
            EntityKind::Item => "item",
        }
    }

    /// Name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Menu => "Menu",
            EntityKind::Category => "Category",
            EntityKind::Item => "Item",
        }
    }

    /// Parses a cache key prefix back into a kind.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "menu" => Some(EntityKind::Menu),
            "category" => Some(EntityKind::Category),
            "item" => Some(EntityKind::Item),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Price in minor currency units (e.g. kobo or cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub i64);

impl Price {
    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Soft-delete bookkeeping shared by every catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// A freshly created, active row.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Returns true if the row passes the default read filter.
    pub fn is_visible(&self) -> bool {
        self.deleted_at.is_none() && self.is_active
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the row passes the given filter.
    pub fn matches(&self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Visible => self.is_visible(),
            Visibility::Any => true,
        }
    }

    /// Marks the row as deleted. Both markers change together.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.is_active = false;
        self.updated_at = at;
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// A published menu. Categories link to menus, never the other way around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: MenuId,
    pub title: String,
    pub description: Option<String>,
    /// Derived from category links; ignored when a menu is saved.
    pub category_ids: Vec<CategoryId>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// A menu section. Owns its item links and its menu links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub description: Option<String>,
    pub menu_ids: Vec<MenuId>,
    pub item_ids: Vec<ItemId>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// A sellable dish or drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category_id: Option<CategoryId>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

/// Common accessors used by association checks and the sweeper.
pub trait CatalogEntity {
    const KIND: EntityKind;

    fn id(&self) -> i64;
    fn title(&self) -> &str;
    fn lifecycle(&self) -> &Lifecycle;
}

impl CatalogEntity for Menu {
    const KIND: EntityKind = EntityKind::Menu;

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl CatalogEntity for Category {
    const KIND: EntityKind = EntityKind::Category;

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl CatalogEntity for Item {
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

/// Fields needed to insert a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenu {
    pub title: String,
    pub description: Option<String>,
}

/// Fields needed to insert a category, with relations already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub title: String,
    pub description: Option<String>,
    pub menu_ids: Vec<MenuId>,
    pub item_ids: Vec<ItemId>,
}

/// Fields needed to insert an item, with its category already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category_id: Option<CategoryId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_new_lifecycle_is_visible() {
        let lifecycle = Lifecycle::new(now());
        assert!(lifecycle.is_visible());
        assert!(lifecycle.matches(Visibility::Visible));
        assert!(!lifecycle.is_deleted());
    }

    #[test]
    fn test_soft_delete_sets_both_markers() {
        let mut lifecycle = Lifecycle::new(now());
        let later = now() + chrono::Duration::hours(1);
        lifecycle.soft_delete(later);

        assert_eq!(lifecycle.deleted_at, Some(later));
        assert!(!lifecycle.is_active);
        assert_eq!(lifecycle.updated_at, later);
        assert!(!lifecycle.matches(Visibility::Visible));
        assert!(lifecycle.matches(Visibility::Any));
    }

    #[test]
    fn test_inactive_row_is_not_visible() {
        let mut lifecycle = Lifecycle::new(now());
        lifecycle.is_active = false;
        assert!(!lifecycle.is_visible());
    }

    #[test]
    fn test_entity_kind_prefix_round_trip() {
        for kind in [EntityKind::Menu, EntityKind::Category, EntityKind::Item] {
            assert_eq!(EntityKind::from_prefix(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::from_prefix("user"), None);
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price(250000).to_string(), "2500.00");
        assert_eq!(Price(5).to_string(), "0.05");
        assert_eq!(Price(-150).to_string(), "-1.50");
    }

    #[test]
    fn test_item_serializes_camel_case_with_flattened_lifecycle() {
        let item = Item {
            id: 3,
            title: "Chicken Pizza".to_string(),
            description: None,
            price: Some(Price(250000)),
            category_id: Some(1),
            lifecycle: Lifecycle::new(now()),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["categoryId"], 1);
        assert_eq!(json["price"], 250000);
        assert_eq!(json["isActive"], true);
        assert!(json["deletedAt"].is_null());
        assert!(json.get("lifecycle").is_none());
    }
}
