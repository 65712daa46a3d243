// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// API error types
///
/// Each OAuth callback step maps to a distinct variant so logs and response
/// codes can tell apart "user declined consent", "forged or stale state",
/// "LinkedIn rejected the exchange", "new user provisioning failed" and
/// "returning user write failed".
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
    DatabaseError(sqlx::Error),
    ValidationError(String),
    Configuration(String),
    ProviderDenied(String),
    MissingCode(String),
    CsrfValidation(String),
    TokenExchange(String),
    IdentityFetch(String),
    Provisioning(String),
    AccountStore(String),
    Timeout(String),
    PublishError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            ApiError::ProviderDenied(msg) => write!(f, "Provider Denied: {}", msg),
            ApiError::MissingCode(msg) => write!(f, "Missing Code: {}", msg),
            ApiError::CsrfValidation(msg) => write!(f, "CSRF Validation Failed: {}", msg),
            ApiError::TokenExchange(msg) => write!(f, "Token Exchange Failed: {}", msg),
            ApiError::IdentityFetch(msg) => write!(f, "Identity Fetch Failed: {}", msg),
            ApiError::Provisioning(msg) => write!(f, "Account Provisioning Failed: {}", msg),
            ApiError::AccountStore(msg) => write!(f, "Account Store Error: {}", msg),
            ApiError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ApiError::PublishError(msg) => write!(f, "Publish Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    /// Machine-readable error kind used in responses and logs
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServer(_) => "INTERNAL_SERVER_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Configuration(_) => "CONFIGURATION_ERROR",
            ApiError::ProviderDenied(_) => "PROVIDER_DENIED",
            ApiError::MissingCode(_) => "MISSING_CODE",
            ApiError::CsrfValidation(_) => "CSRF_VALIDATION",
            ApiError::TokenExchange(_) => "TOKEN_EXCHANGE_FAILED",
            ApiError::IdentityFetch(_) => "IDENTITY_FETCH_FAILED",
            ApiError::Provisioning(_) => "ACCOUNT_PROVISIONING_ERROR",
            ApiError::AccountStore(_) => "ACCOUNT_STORE_ERROR",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::PublishError(_) => "PUBLISH_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let code = self.code();
        let (status, error_message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServer(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Configuration(msg) => {
                error!(error = %msg, "Configuration error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::ProviderDenied(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::MissingCode(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::CsrfValidation(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::TokenExchange(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::IdentityFetch(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Provisioning(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::AccountStore(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::PublishError(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}
