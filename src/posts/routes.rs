//! Content post routes

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;

/// Creates and returns the content post router
///
/// # Routes
/// - `GET /api/posts` - List the caller's posts
/// - `POST /api/posts` - Create a draft post
/// - `GET /api/posts/:id` - Get a post
/// - `PUT /api/posts/:id` - Update a draft or scheduled post
/// - `DELETE /api/posts/:id` - Delete a post
/// - `POST /api/posts/:id/schedule` - Queue a post for a future time
/// - `POST /api/posts/:id/publish` - Publish a post to LinkedIn now
pub fn post_routes() -> Router {
    Router::new()
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts", post(handlers::create_post))
        .route("/api/posts/:id", get(handlers::get_post))
        .route("/api/posts/:id", put(handlers::update_post))
        .route("/api/posts/:id", delete(handlers::delete_post))
        .route("/api/posts/:id/schedule", post(handlers::schedule_post))
        .route("/api/posts/:id/publish", post(handlers::publish_post))
}
