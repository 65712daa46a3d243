// src/services/linkedin.rs
//! LinkedIn OAuth and REST API client.
//!
//! Owns the provider side of the login handshake (authorization URL, code
//! exchange, identity fetch) plus the two content APIs the dashboard uses:
//! UGC post publishing and per-post social statistics.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::common::safe_token_log;

const DEFAULT_OAUTH_BASE: &str = "https://www.linkedin.com/oauth/v2";
const DEFAULT_API_BASE: &str = "https://api.linkedin.com/v2";

/// Fixed scope list requested on every login. Must stay in sync with the
/// scopes enabled on the LinkedIn app registration.
pub const OAUTH_SCOPES: &str = "openid profile email w_member_social";

/// Outbound calls to LinkedIn are bounded so a provider outage cannot hang
/// a login indefinitely.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LinkedInError {
    #[error("LinkedIn OAuth not configured: {0} is missing or empty")]
    NotConfigured(&'static str),

    #[error("Token exchange failed (HTTP {status}): {body}")]
    ExchangeFailed { status: u16, body: String },

    #[error("No access token in provider response: {0}")]
    MissingAccessToken(String),

    #[error("Identity fetch failed (HTTP {status}): {body}")]
    IdentityFetchFailed { status: u16, body: String },

    #[error("Post publish failed (HTTP {status}): {body}")]
    PublishFailed { status: u16, body: String },

    #[error("Statistics fetch failed (HTTP {status}): {body}")]
    StatisticsFailed { status: u16, body: String },

    #[error("Provider request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid provider response: {0}")]
    SerializationError(String),
}

/// OAuth client credentials plus the redirect URI registered with LinkedIn.
/// The client secret is server-held and never leaves this service.
#[derive(Clone)]
pub struct LinkedInConfig {
    pub client_id: String,
    client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for LinkedInConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedInConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl LinkedInConfig {
    /// Build a config, rejecting missing or empty values up front so a
    /// broken redirect is never issued.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, LinkedInError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let redirect_uri = redirect_uri.into();

        if client_id.trim().is_empty() {
            return Err(LinkedInError::NotConfigured("LINKEDIN_CLIENT_ID"));
        }
        if client_secret.trim().is_empty() {
            return Err(LinkedInError::NotConfigured("LINKEDIN_CLIENT_SECRET"));
        }
        if redirect_uri.trim().is_empty() {
            return Err(LinkedInError::NotConfigured("LINKEDIN_REDIRECT_URI"));
        }

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Load OAuth credentials from environment variables, failing fast at
    /// startup rather than producing a cryptic provider error later.
    pub fn from_env() -> Result<Self, LinkedInError> {
        let client_id = env::var("LINKEDIN_CLIENT_ID")
            .map_err(|_| LinkedInError::NotConfigured("LINKEDIN_CLIENT_ID"))?;
        let client_secret = env::var("LINKEDIN_CLIENT_SECRET")
            .map_err(|_| LinkedInError::NotConfigured("LINKEDIN_CLIENT_SECRET"))?;
        let redirect_uri = env::var("LINKEDIN_REDIRECT_URI")
            .map_err(|_| LinkedInError::NotConfigured("LINKEDIN_REDIRECT_URI"))?;

        Self::new(client_id, client_secret, redirect_uri)
    }
}

/// Token set returned by the code exchange. The raw response body is kept
/// out of this type; failures carry it for diagnostics instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

// Exchange responses are parsed leniently first so a 200 with no
// access_token is reported as an exchange failure, not a decode error.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

/// Identity claims from the OpenID Connect userinfo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInUserInfo {
    /// Provider-issued stable subject identifier.
    pub sub: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub picture: Option<String>,
}

impl LinkedInUserInfo {
    /// Email to provision the account with. LinkedIn may omit the email
    /// claim; synthesize a deterministic placeholder from the subject id so
    /// account creation never blocks on a missing field.
    pub fn resolved_email(&self) -> String {
        match &self.email {
            Some(email) if !email.trim().is_empty() => email.clone(),
            _ => format!("{}@linkedin.temp", self.sub),
        }
    }
}

/// Engagement statistics for one published post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostStatistics {
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub clicks: i64,
}

#[derive(Debug, Deserialize)]
struct UgcPostResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct LinkedInService {
    config: LinkedInConfig,
    client: Client,
    oauth_base: String,
    api_base: String,
}

impl LinkedInService {
    pub fn new(config: LinkedInConfig) -> Self {
        Self::with_base_urls(
            config,
            DEFAULT_OAUTH_BASE.to_string(),
            DEFAULT_API_BASE.to_string(),
        )
    }

    /// Construct against custom endpoints. Tests point this at a local mock
    /// server instead of linkedin.com.
    pub fn with_base_urls(config: LinkedInConfig, oauth_base: String, api_base: String) -> Self {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            client,
            oauth_base,
            api_base,
        }
    }

    pub fn config(&self) -> &LinkedInConfig {
        &self.config
    }

    /// Build the authorization endpoint URL embedding the caller-supplied
    /// CSRF state token.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}/authorization?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.oauth_base,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a token set.
    ///
    /// The redirect_uri must byte-for-byte match the one used when building
    /// the authorization URL or LinkedIn rejects the exchange.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, LinkedInError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(format!("{}/accessToken", self.oauth_base))
            .form(&params)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LinkedInError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            error!(status = %status, body = %body, "LinkedIn token exchange failed");
            return Err(LinkedInError::ExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawTokenResponse = serde_json::from_str(&body)
            .map_err(|e| LinkedInError::SerializationError(e.to_string()))?;

        let access_token = match raw.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                error!(body = %body, "Provider returned success without an access token");
                return Err(LinkedInError::MissingAccessToken(body));
            }
        };

        info!(
            access_token = %safe_token_log(&access_token),
            has_refresh_token = raw.refresh_token.is_some(),
            expires_in = raw.expires_in.unwrap_or(0),
            "Authorization code exchanged for tokens"
        );

        Ok(TokenResponse {
            access_token,
            refresh_token: raw.refresh_token,
            expires_in: raw.expires_in.unwrap_or(0),
            token_type: raw.token_type,
            scope: raw.scope,
        })
    }

    /// Fetch the identity claims for an access token.
    pub async fn get_user_info(
        &self,
        access_token: &str,
    ) -> Result<LinkedInUserInfo, LinkedInError> {
        let response = self
            .client
            .get(format!("{}/userinfo", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "LinkedIn identity fetch failed");
            return Err(LinkedInError::IdentityFetchFailed {
                status: status.as_u16(),
                body,
            });
        }

        let user_info = response
            .json::<LinkedInUserInfo>()
            .await
            .map_err(|e| LinkedInError::SerializationError(e.to_string()))?;

        debug!(
            subject = %user_info.sub,
            has_email = user_info.email.is_some(),
            "Fetched LinkedIn identity"
        );

        Ok(user_info)
    }

    /// Publish a text share to the member's feed, returning the LinkedIn
    /// post id.
    pub async fn publish_post(
        &self,
        access_token: &str,
        linkedin_id: &str,
        content: &str,
    ) -> Result<String, LinkedInError> {
        let payload = serde_json::json!({
            "author": format!("urn:li:person:{}", linkedin_id),
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": content },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let response = self
            .client
            .post(format!("{}/ugcPosts", self.api_base))
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "LinkedIn post publish failed");
            return Err(LinkedInError::PublishFailed {
                status: status.as_u16(),
                body,
            });
        }

        let ugc_response = response
            .json::<UgcPostResponse>()
            .await
            .map_err(|e| LinkedInError::SerializationError(e.to_string()))?;

        info!(linkedin_post_id = %ugc_response.id, "Post published to LinkedIn");

        Ok(ugc_response.id)
    }

    /// Fetch engagement statistics for a published post.
    pub async fn get_post_statistics(
        &self,
        access_token: &str,
        linkedin_post_id: &str,
    ) -> Result<PostStatistics, LinkedInError> {
        let response = self
            .client
            .get(format!(
                "{}/socialActions/{}/statistics",
                self.api_base, linkedin_post_id
            ))
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(
                status = %status,
                linkedin_post_id = %linkedin_post_id,
                "LinkedIn statistics fetch failed"
            );
            return Err(LinkedInError::StatisticsFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<PostStatistics>()
            .await
            .map_err(|e| LinkedInError::SerializationError(e.to_string()))
    }
}

/// Timeouts surface as a distinct kind so a hanging provider is
/// distinguishable from a rejected request.
fn classify_request_error(e: reqwest::Error) -> LinkedInError {
    if e.is_timeout() {
        LinkedInError::Timeout(e.to_string())
    } else {
        LinkedInError::RequestFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LinkedInConfig {
        LinkedInConfig::new("client123", "secret456", "https://app/cb").unwrap()
    }

    #[test]
    fn test_config_rejects_empty_client_id() {
        let result = LinkedInConfig::new("", "secret", "https://app/cb");
        assert!(matches!(
            result,
            Err(LinkedInError::NotConfigured("LINKEDIN_CLIENT_ID"))
        ));
    }

    #[test]
    fn test_config_rejects_empty_redirect_uri() {
        let result = LinkedInConfig::new("client123", "secret", "  ");
        assert!(matches!(
            result,
            Err(LinkedInError::NotConfigured("LINKEDIN_REDIRECT_URI"))
        ));
    }

    #[test]
    fn test_authorization_url_embeds_encoded_params() {
        let service = LinkedInService::new(test_config());
        let url = service.authorization_url("abc123def456ghi7");

        assert!(url.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp%2Fcb"));
        assert!(url.contains("state=abc123def456ghi7"));
        assert!(url.contains("scope=openid%20profile%20email%20w_member_social"));
    }

    #[test]
    fn test_resolved_email_prefers_provider_claim() {
        let identity = LinkedInUserInfo {
            sub: "abc123".to_string(),
            given_name: None,
            family_name: None,
            name: None,
            email: Some("user@example.com".to_string()),
            email_verified: Some(true),
            picture: None,
        };
        assert_eq!(identity.resolved_email(), "user@example.com");
    }

    #[test]
    fn test_resolved_email_synthesizes_stable_placeholder() {
        let identity = LinkedInUserInfo {
            sub: "abc123".to_string(),
            given_name: None,
            family_name: None,
            name: None,
            email: None,
            email_verified: None,
            picture: None,
        };
        assert_eq!(identity.resolved_email(), "abc123@linkedin.temp");
        // Stable across repeated calls for the same subject
        assert_eq!(identity.resolved_email(), identity.resolved_email());
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok_abc","expires_in":5184000,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let service =
            LinkedInService::with_base_urls(test_config(), server.url(), server.url());
        let tokens = service.exchange_code("code_xyz", "https://app/cb").await.unwrap();

        assert_eq!(tokens.access_token, "tok_abc");
        assert_eq!(tokens.expires_in, 5184000);
        assert!(tokens.refresh_token.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_code_non_success_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accessToken")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let service =
            LinkedInService::with_base_urls(test_config(), server.url(), server.url());
        let err = service
            .exchange_code("stale_code", "https://app/cb")
            .await
            .unwrap_err();

        match err {
            LinkedInError::ExchangeFailed { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected ExchangeFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_missing_access_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_body(r#"{"expires_in":5184000}"#)
            .create_async()
            .await;

        let service =
            LinkedInService::with_base_urls(test_config(), server.url(), server.url());
        let err = service
            .exchange_code("code_xyz", "https://app/cb")
            .await
            .unwrap_err();

        assert!(matches!(err, LinkedInError::MissingAccessToken(_)));
    }

    #[tokio::test]
    async fn test_get_user_info_parses_claims() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"sub":"abc123","given_name":"Ada","family_name":"Lovelace","email":"ada@example.com"}"#,
            )
            .create_async()
            .await;

        let service =
            LinkedInService::with_base_urls(test_config(), server.url(), server.url());
        let identity = service.get_user_info("tok_abc").await.unwrap();

        assert_eq!(identity.sub, "abc123");
        assert_eq!(identity.given_name.as_deref(), Some("Ada"));
        assert_eq!(identity.resolved_email(), "ada@example.com");
    }

    #[tokio::test]
    async fn test_get_user_info_non_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(401)
            .with_body(r#"{"message":"Invalid access token"}"#)
            .create_async()
            .await;

        let service =
            LinkedInService::with_base_urls(test_config(), server.url(), server.url());
        let err = service.get_user_info("bad_token").await.unwrap_err();

        assert!(matches!(
            err,
            LinkedInError::IdentityFetchFailed { status: 401, .. }
        ));
    }
}
