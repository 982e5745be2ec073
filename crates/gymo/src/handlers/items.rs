//! Item CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use gymo_core::catalog::{CreateItemRequest, Item, ItemId, UpdateItemRequest};

use crate::{handlers::AppError, state::AppState};

/// List visible items (GET /api/items).
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.service.list_items().await?))
}

/// Create an item (POST /api/items).
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let item = state.service.create_item(payload).await?;
    tracing::info!(item_id = item.id, title = %item.title, "Created item");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Get a visible item (GET /api/items/{id}).
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.service.get_item(id).await?))
}

/// Partially update an item (PATCH /api/items/{id}).
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.service.update_item(id, payload).await?))
}

/// Soft-delete an item (DELETE /api/items/{id}).
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<StatusCode, AppError> {
    state.service.delete_item(id).await?;
    tracing::info!(item_id = id, "Deleted item");
    Ok(StatusCode::NO_CONTENT)
}
