//! Category CRUD handlers.
//!
//! `menuIds` and `itemIds` in a PATCH body are three-state: omit the field to
//! keep the links, send `null` or `[]` to drop them, send ids to replace them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use gymo_core::catalog::{Category, CategoryId, CreateCategoryRequest, UpdateCategoryRequest};

use crate::{handlers::AppError, state::AppState};

/// List visible categories (GET /api/categories).
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.service.list_categories().await?))
}

/// Create a category (POST /api/categories).
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = state.service.create_category(payload).await?;
    tracing::info!(category_id = category.id, title = %category.title, "Created category");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Get a visible category (GET /api/categories/{id}).
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.service.get_category(id).await?))
}

/// Partially update a category (PATCH /api/categories/{id}).
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.service.update_category(id, payload).await?))
}

/// Soft-delete a category (DELETE /api/categories/{id}).
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, AppError> {
    state.service.delete_category(id).await?;
    tracing::info!(category_id = id, "Deleted category");
    Ok(StatusCode::NO_CONTENT)
}

/// Drop every cached category entry (DELETE /api/categories/cache).
pub async fn clear_category_cache(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.service.clear_category_cache().await?;
    Ok(StatusCode::NO_CONTENT)
}
