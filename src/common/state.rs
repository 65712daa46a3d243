// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::OAuthStateStore;
use crate::services::{EncryptionService, LinkedInService};

/// Application state containing database pool, services, and configuration.
/// All provider HTTP traffic goes through the LinkedIn service's own client.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub linkedin_service: Arc<LinkedInService>,
    pub encryption_service: Arc<EncryptionService>,
    pub oauth_states: OAuthStateStore,
}
