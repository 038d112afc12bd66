//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Users
        .route("/api/v1/users/:id", get(handlers::get_user))
        .route("/api/v1/users/by/:field/:value", get(handlers::get_user_by_field))

        // Cache
        .route("/api/v1/cache/stats", get(handlers::cache_stats))
        .route("/api/v1/cache/clear", post(handlers::clear_cache))

        .with_state(state)
}
