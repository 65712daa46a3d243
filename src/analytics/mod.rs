//! # Analytics Module
//!
//! Hourly engagement snapshots for published posts, pulled from LinkedIn's
//! statistics endpoint on demand.

pub mod handlers;
pub mod models;
pub mod routes;


pub use routes::analytics_routes;
