//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/linkedin` - Start LinkedIn OAuth flow (redirect)
/// - `GET /auth/linkedin/callback` - Complete the handshake
/// - `POST /api/auth/logout` - Logout (client-side token removal)
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/linkedin", get(handlers::linkedin_login_start))
        .route(
            "/auth/linkedin/callback",
            get(handlers::linkedin_callback),
        )
        .route("/api/auth/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
