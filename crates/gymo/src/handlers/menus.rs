//! Menu CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use gymo_core::catalog::{CreateMenuRequest, Menu, MenuId, UpdateMenuRequest};

use crate::{handlers::AppError, state::AppState};

/// List visible menus (GET /api/menus).
pub async fn list_menus(State(state): State<AppState>) -> Result<Json<Vec<Menu>>, AppError> {
    Ok(Json(state.service.list_menus().await?))
}

/// Create a menu (POST /api/menus).
pub async fn create_menu(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuRequest>,
) -> Result<(StatusCode, Json<Menu>), AppError> {
    let menu = state.service.create_menu(payload).await?;
    tracing::info!(menu_id = menu.id, title = %menu.title, "Created menu");
    Ok((StatusCode::CREATED, Json(menu)))
}

/// Get a visible menu (GET /api/menus/{id}).
pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> Result<Json<Menu>, AppError> {
    Ok(Json(state.service.get_menu(id).await?))
}

/// Partially update a menu (PATCH /api/menus/{id}).
pub async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
    Json(payload): Json<UpdateMenuRequest>,
) -> Result<Json<Menu>, AppError> {
    Ok(Json(state.service.update_menu(id, payload).await?))
}

/// Soft-delete a menu (DELETE /api/menus/{id}).
pub async fn delete_menu(
    State(state): State<AppState>,
    Path(id): Path<MenuId>,
) -> Result<StatusCode, AppError> {
    state.service.delete_menu(id).await?;
    tracing::info!(menu_id = id, "Deleted menu");
    Ok(StatusCode::NO_CONTENT)
}
