//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - LinkedIn OAuth authorization-code flow (redirect, callback, upsert)
//! - CSRF state store for in-flight login attempts
//! - JWT session issuance and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state_store;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
pub use state_store::OAuthStateStore;
