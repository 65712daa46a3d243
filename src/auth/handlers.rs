//! Authentication handlers
//!
//! Implements the LinkedIn OAuth authorization-code handshake:
//! login start (redirect with CSRF state), the callback state machine
//! (error check, code check, state validation, code exchange, identity
//! fetch, account upsert, session issuance), and session endpoints.

use axum::extract::{Extension, Query};
use axum::response::Redirect;
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::AuthedUser;
use super::models::{CallbackParams, Claims, LoginResponse, PublicUser, User};
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState};
use crate::services::LinkedInError;

/// Session tokens live for 24 hours; re-authentication supersedes them.
const SESSION_TTL_HOURS: i64 = 24;

/// GET /auth/linkedin - Start the LinkedIn OAuth flow
///
/// Generates and stores a CSRF state token, then redirects the browser to
/// LinkedIn's authorization endpoint. Configuration is validated at startup,
/// so reaching this handler means client id and redirect URI are present.
pub async fn linkedin_login_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Redirect, ApiError> {
    let state = state_lock.read().await.clone();

    // Abandoned attempts expire here rather than accumulating
    state.oauth_states.cleanup_expired();

    let redirect_uri = state.linkedin_service.config().redirect_uri.clone();
    let csrf_state = state.oauth_states.generate(&redirect_uri);
    let auth_url = state.linkedin_service.authorization_url(&csrf_state);

    info!(
        client_id = %state.linkedin_service.config().client_id,
        redirect_uri = %redirect_uri,
        "Starting LinkedIn OAuth flow"
    );

    Ok(Redirect::to(&auth_url))
}

/// GET /auth/linkedin/callback - Complete the OAuth handshake
///
/// On success returns a session JWT plus the identity snapshot. On any
/// failure returns a single machine-readable error kind; the browser is
/// expected to restart the whole flow from /auth/linkedin.
pub async fn linkedin_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<LoginResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let response = complete_linkedin_login(&state, params).await?;
    Ok(Json(response))
}

/// The callback state machine. Linear; each step's failure is terminal for
/// this login attempt and nothing is retried.
pub async fn complete_linkedin_login(
    state: &AppState,
    params: CallbackParams,
) -> Result<LoginResponse, ApiError> {
    // Step 1: provider-supplied error aborts before anything else
    if let Some(provider_error) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!(
            provider_error = %provider_error,
            description = %description,
            "LinkedIn OAuth callback carried a provider error"
        );
        return Err(ApiError::ProviderDenied(format!(
            "LinkedIn denied the authorization request: {}",
            provider_error
        )));
    }

    // Step 2: an authorization code must be present
    let code = params.code.ok_or_else(|| {
        warn!("LinkedIn OAuth callback arrived without an authorization code");
        ApiError::MissingCode("no authorization code in callback".to_string())
    })?;

    // Step 3: state validation. Security-critical: must short-circuit before
    // any network call so a forged callback never spends the code.
    let state_entry = params
        .state
        .as_deref()
        .and_then(|s| state.oauth_states.consume(s))
        .ok_or_else(|| {
            warn!(
                state_present = params.state.is_some(),
                "OAuth state mismatch - possible CSRF attempt or expired login"
            );
            ApiError::CsrfValidation(
                "invalid or missing OAuth state for this login attempt".to_string(),
            )
        })?;

    // Step 4: exchange the code server-side, reusing the exact redirect URI
    // the authorization URL was built with
    let tokens = state
        .linkedin_service
        .exchange_code(&code, &state_entry.redirect_uri)
        .await
        .map_err(|e| match e {
            LinkedInError::Timeout(msg) => {
                ApiError::Timeout(format!("token exchange timed out: {}", msg))
            }
            other => ApiError::TokenExchange(other.to_string()),
        })?;

    // Step 5: fetch the identity snapshot with the fresh access token
    let identity = state
        .linkedin_service
        .get_user_info(&tokens.access_token)
        .await
        .map_err(|e| match e {
            LinkedInError::Timeout(msg) => {
                ApiError::Timeout(format!("identity fetch timed out: {}", msg))
            }
            other => ApiError::IdentityFetch(other.to_string()),
        })?;

    let email = identity.resolved_email();

    debug!(
        subject = %identity.sub,
        email = %safe_email_log(&email),
        "LinkedIn identity fetched, upserting account"
    );

    // Step 6: upsert keyed by the stable subject identifier, never by email
    // (which may be a synthesized placeholder)
    let user = upsert_account(state, &identity.sub, &email, &identity, &tokens).await?;

    // Step 7: bind the session - a signed short-lived token instead of a
    // password derived from the subject id
    let token = issue_session_token(&state.jwt_secret, &user.id)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        linkedin_id = %user.linkedin_id,
        "User authentication successful via LinkedIn OAuth"
    );

    Ok(LoginResponse {
        token,
        expires_in: Duration::hours(SESSION_TTL_HOURS).num_seconds(),
        user: PublicUser::from(&user),
    })
}

/// Insert or update the account row for an external subject id.
///
/// New-row provisioning failures and returning-user write failures are
/// reported as distinct kinds so logs can tell "new user provisioning
/// failed" from "returning user database write failed".
async fn upsert_account(
    state: &AppState,
    subject: &str,
    email: &str,
    identity: &crate::services::LinkedInUserInfo,
    tokens: &crate::services::TokenResponse,
) -> Result<User, ApiError> {
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE linkedin_id = ?")
        .bind(subject)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, linkedin_id = %subject, "Database error checking existing account");
            ApiError::DatabaseError(e)
        })?;

    // Tokens are encrypted before they touch the database
    let access_token_enc = state
        .encryption_service
        .encrypt(&tokens.access_token)
        .map_err(|e| ApiError::InternalServer(format!("token encryption failed: {}", e)))?;
    let refresh_token_enc = tokens
        .refresh_token
        .as_deref()
        .map(|t| state.encryption_service.encrypt(t))
        .transpose()
        .map_err(|e| ApiError::InternalServer(format!("token encryption failed: {}", e)))?;

    let token_expires_at = (Utc::now() + Duration::seconds(tokens.expires_in)).to_rfc3339();
    let profile_data = serde_json::to_string(identity)
        .map_err(|e| ApiError::InternalServer(format!("profile serialization failed: {}", e)))?;

    match existing {
        None => {
            let id = generate_user_id();
            info!(
                user_id = %id,
                email = %safe_email_log(email),
                linkedin_id = %subject,
                "Provisioning new account via LinkedIn OAuth"
            );

            // ON CONFLICT covers the race where two callbacks for the same
            // subject interleave between the existence check and the insert
            sqlx::query(
                r#"
                INSERT INTO users (
                    id, email, first_name, last_name, linkedin_id,
                    linkedin_access_token, linkedin_refresh_token,
                    token_expires_at, profile_data, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
                ON CONFLICT(linkedin_id) DO UPDATE SET
                    email = excluded.email,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    linkedin_access_token = excluded.linkedin_access_token,
                    linkedin_refresh_token = excluded.linkedin_refresh_token,
                    token_expires_at = excluded.token_expires_at,
                    profile_data = excluded.profile_data,
                    updated_at = datetime('now')
                "#,
            )
            .bind(&id)
            .bind(email)
            .bind(identity.given_name.as_deref())
            .bind(identity.family_name.as_deref())
            .bind(subject)
            .bind(&access_token_enc)
            .bind(refresh_token_enc.as_deref())
            .bind(&token_expires_at)
            .bind(&profile_data)
            .execute(&state.db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    linkedin_id = %subject,
                    "New user provisioning failed"
                );
                ApiError::Provisioning("failed to provision new account".to_string())
            })?;
        }
        Some(ref u) => {
            debug!(
                user_id = %u.id,
                linkedin_id = %subject,
                "Returning user, updating account snapshot"
            );

            // Snapshot semantics: every field is overwritten, nothing is merged
            sqlx::query(
                r#"
                UPDATE users SET
                    email = ?,
                    first_name = ?,
                    last_name = ?,
                    linkedin_access_token = ?,
                    linkedin_refresh_token = ?,
                    token_expires_at = ?,
                    profile_data = ?,
                    updated_at = datetime('now')
                WHERE linkedin_id = ?
                "#,
            )
            .bind(email)
            .bind(identity.given_name.as_deref())
            .bind(identity.family_name.as_deref())
            .bind(&access_token_enc)
            .bind(refresh_token_enc.as_deref())
            .bind(&token_expires_at)
            .bind(&profile_data)
            .bind(subject)
            .execute(&state.db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = %u.id,
                    linkedin_id = %subject,
                    "Returning user database write failed"
                );
                ApiError::AccountStore("failed to update account record".to_string())
            })?;
        }
    }

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE linkedin_id = ?")
        .bind(subject)
        .fetch_one(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, linkedin_id = %subject, "Failed to read back upserted account");
            ApiError::DatabaseError(e)
        })
}

/// Issue a signed session token bound to the internal account id.
pub fn issue_session_token(jwt_secret: &str, user_id: &str) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::hours(SESSION_TTL_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = %user_id, "JWT encoding error during authentication");
        ApiError::InternalServer("session token issuance failed".to_string())
    })
}

/// GET /api/me
/// Returns the current authenticated user's information
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let resp = serde_json::json!({
        "user": PublicUser::from(&user),
        "linkedin_connected": user.linkedin_access_token.is_some(),
    });
    Ok(Json(resp))
}

/// POST /api/auth/logout
/// Logout is handled client-side by dropping the JWT; this endpoint just
/// acknowledges the request.
pub async fn logout_handler(_authed: AuthedUser) -> Result<Json<serde_json::Value>, ApiError> {
    info!("User logout successful");
    let resp = serde_json::json!({
        "message": "Logout successful"
    });
    Ok(Json(resp))
}
