//! Inspection handlers.
//!
//! Return a row whatever its lifecycle state, soft-deleted rows included.
//! Never cached.

use axum::{
    extract::{Path, State},
    Json,
};

use gymo_core::catalog::{Category, CategoryId, Item, ItemId, Menu, MenuId};

use crate::{handlers::AppError, state::AppState};

/// GET /api/admin/menus/{id}
pub async fn inspect_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> Result<Json<Menu>, AppError> {
    Ok(Json(state.service.inspect_menu(id).await?))
}

/// GET /api/admin/categories/{id}
pub async fn inspect_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.service.inspect_category(id).await?))
}

/// GET /api/admin/items/{id}
pub async fn inspect_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.service.inspect_item(id).await?))
}
