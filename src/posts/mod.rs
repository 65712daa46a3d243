//! # Posts Module
//!
//! Content post lifecycle for the dashboard: draft, schedule, publish to the
//! connected LinkedIn account, delete.

pub mod handlers;
pub mod models;
pub mod routes;


pub use models::ContentPost;
pub use routes::post_routes;
