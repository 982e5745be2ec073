use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        admin::{inspect_category, inspect_item, inspect_menu},
        categories::{
            clear_category_cache, create_category, delete_category, get_category,
            list_categories, update_category,
        },
        health::livez,
        items::{create_item, delete_item, get_item, list_items, update_item},
        menus::{create_menu, delete_menu, get_menu, list_menus, update_menu},
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        // Menu routes
        .route("/menus", get(list_menus).post(create_menu))
        .route(
            "/menus/{id}",
            get(get_menu).patch(update_menu).delete(delete_menu),
        )
        // Category routes
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/cache", delete(clear_category_cache))
        .route(
            "/categories/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        // Item routes
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        // Inspection routes
        .route("/admin/menus/{id}", get(inspect_menu))
        .route("/admin/categories/{id}", get(inspect_category))
        .route("/admin/items/{id}", get(inspect_item))
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}
