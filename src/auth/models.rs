//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// User database model. Token columns hold AES-256-GCM ciphertext and are
/// never serialized into responses.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub linkedin_id: String,
    #[serde(skip_serializing)]
    pub linkedin_access_token: Option<String>,
    #[serde(skip_serializing)]
    pub linkedin_refresh_token: Option<String>,
    #[serde(skip_serializing)]
    pub token_expires_at: Option<String>,
    #[serde(skip_serializing)]
    pub profile_data: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Query parameters LinkedIn sends back to the callback endpoint.
#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Account fields exposed to the browser after login.
#[derive(Serialize, Debug)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub linkedin_id: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            linkedin_id: user.linkedin_id.clone(),
        }
    }
}

/// Successful callback response: a signed session token plus the identity
/// snapshot. Provider tokens are deliberately absent.
#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: PublicUser,
}
