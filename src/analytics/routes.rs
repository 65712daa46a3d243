//! Analytics routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the analytics router
///
/// # Routes
/// - `POST /api/analytics/sync` - Pull fresh statistics from LinkedIn
/// - `GET /api/analytics/metrics` - List recorded snapshots
pub fn analytics_routes() -> Router {
    Router::new()
        .route("/api/analytics/sync", post(handlers::sync_analytics))
        .route("/api/analytics/metrics", get(handlers::list_metrics))
}
