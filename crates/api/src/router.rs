use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{self, AppState};

/// Create the main application router with all API endpoints
pub fn create_router(state: AppState) -> Router {
    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Metrics endpoints
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/metrics/templates", get(handlers::get_template_metrics))
        .route("/api/metrics/days", get(handlers::get_day_metrics))
        // Cache management
        .route("/api/cache/refresh", post(handlers::refresh_cache))
        .route("/api/cache/invalidate", post(handlers::invalidate_cache))
        // Add shared state
        .with_state(state)
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
