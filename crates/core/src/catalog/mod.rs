mod association;
mod requests;
mod retention;
mod types;

pub use association::{
    distinct_ids, ensure_all_resolved, ensure_resolved, ensure_visible, missing_ids,
};
pub use requests::{
    CreateCategoryRequest, CreateItemRequest, CreateMenuRequest, Patch, UpdateCategoryRequest,
    UpdateItemRequest, UpdateMenuRequest,
};
pub use retention::{is_expired, retention_cutoff, DEFAULT_RETENTION_DAYS};
pub use types::{
    CatalogEntity, Category, CategoryId, EntityKind, Item, ItemId, Lifecycle, Menu, MenuId,
    NewCategory, NewItem, NewMenu, Price, Visibility,
};
