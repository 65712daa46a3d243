//! Tests for the auth module
//!
//! Exercises the OAuth callback state machine end to end against a mock
//! provider and an in-memory database: step ordering, CSRF short-circuit,
//! upsert-by-subject semantics, placeholder emails, and session issuance.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    use crate::auth::handlers::{complete_linkedin_login, issue_session_token};
    use crate::auth::models::{CallbackParams, Claims, User};
    use crate::auth::state_store::OAuthStateStore;
    use crate::common::{migrations, ApiError, AppState};
    use crate::services::{EncryptionService, LinkedInConfig, LinkedInService};

    const TOKEN_BODY: &str =
        r#"{"access_token":"tok_abc","expires_in":5184000,"token_type":"Bearer"}"#;
    const IDENTITY_BODY: &str = r#"{"sub":"subj_001","given_name":"Ada","family_name":"Lovelace","email":"ada@example.com"}"#;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        migrations::run_migrations(&pool).await.expect("migrations");
        pool
    }

    fn test_state(pool: SqlitePool, provider_url: &str) -> AppState {
        let config = LinkedInConfig::new("client123", "secret456", "https://app/cb").unwrap();
        let linkedin = LinkedInService::with_base_urls(
            config,
            provider_url.to_string(),
            provider_url.to_string(),
        );
        let key = EncryptionService::generate_key();

        AppState {
            db: pool,
            jwt_secret: "test_secret_key".to_string(),
            linkedin_service: Arc::new(linkedin),
            encryption_service: Arc::new(EncryptionService::from_key(&key).unwrap()),
            oauth_states: OAuthStateStore::new(),
        }
    }

    fn callback_params(code: &str, state: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    async fn user_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_callback_creates_exactly_one_account() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(IDENTITY_BODY)
            .create_async()
            .await;

        let state = test_state(test_pool().await, &server.url());
        let csrf = state.oauth_states.generate("https://app/cb");

        let response = complete_linkedin_login(&state, callback_params("code_1", &csrf))
            .await
            .expect("callback succeeds");

        assert_eq!(user_count(&state.db).await, 1);
        assert_eq!(response.user.linkedin_id, "subj_001");
        assert_eq!(response.user.email, "ada@example.com");
        assert_eq!(response.user.first_name.as_deref(), Some("Ada"));

        // Session token is bound to the internal account id
        let decoded = decode::<Claims>(
            &response.token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("session token decodes");
        assert_eq!(decoded.claims.sub, response.user.id);
    }

    #[tokio::test]
    async fn test_access_token_is_stored_encrypted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(IDENTITY_BODY)
            .create_async()
            .await;

        let state = test_state(test_pool().await, &server.url());
        let csrf = state.oauth_states.generate("https://app/cb");
        complete_linkedin_login(&state, callback_params("code_1", &csrf))
            .await
            .unwrap();

        let user: User = sqlx::query_as("SELECT * FROM users WHERE linkedin_id = 'subj_001'")
            .fetch_one(&state.db)
            .await
            .unwrap();

        let stored = user.linkedin_access_token.expect("token stored");
        assert_ne!(stored, "tok_abc", "token must not be stored in plaintext");
        assert_eq!(state.encryption_service.decrypt(&stored).unwrap(), "tok_abc");
    }

    #[tokio::test]
    async fn test_state_mismatch_performs_zero_network_calls() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/accessToken")
            .expect(0)
            .create_async()
            .await;

        let state = test_state(test_pool().await, &server.url());
        // A login attempt is in flight, but the callback carries a different state
        let _in_flight = state.oauth_states.generate("https://app/cb");

        let err = complete_linkedin_login(&state, callback_params("code_1", "forged_state_value"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::CsrfValidation(_)));
        token_mock.assert_async().await;
        assert_eq!(user_count(&state.db).await, 0);
    }

    #[tokio::test]
    async fn test_state_already_consumed_fails_second_callback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(IDENTITY_BODY)
            .create_async()
            .await;

        let state = test_state(test_pool().await, &server.url());
        let csrf = state.oauth_states.generate("https://app/cb");

        complete_linkedin_login(&state, callback_params("code_1", &csrf))
            .await
            .expect("first callback succeeds");

        // Replaying the consumed state must fail cleanly
        let err = complete_linkedin_login(&state, callback_params("code_2", &csrf))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::CsrfValidation(_)));
    }

    #[tokio::test]
    async fn test_repeat_login_upserts_single_row_with_fresh_fields() {
        let pool = test_pool().await;

        // First login
        let mut server1 = mockito::Server::new_async().await;
        server1
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_body(TOKEN_BODY)
            .create_async()
            .await;
        server1
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(IDENTITY_BODY)
            .create_async()
            .await;

        let state1 = test_state(pool.clone(), &server1.url());
        let csrf1 = state1.oauth_states.generate("https://app/cb");
        let first = complete_linkedin_login(&state1, callback_params("code_1", &csrf1))
            .await
            .unwrap();

        // Second login, same subject, provider reports changed name and email
        let mut server2 = mockito::Server::new_async().await;
        server2
            .mock("POST", "/accessToken")
            .with_status(200)
            .with_body(r#"{"access_token":"tok_def","expires_in":5184000}"#)
            .create_async()
            .await;
        server2
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(
                r#"{"sub":"subj_001","given_name":"Ada","family_name":"King","email":"ada.king@example.com"}"#,
            )
            .create_async()
            .await;

        let state2 = test_state(pool.clone(), &server2.url());
        let csrf2 = state2.oauth_states.generate("https://app/cb");
        let second = complete_linkedin_login(&state2, callback_params("code_2", &csrf2))
            .await
            .unwrap();

        // One row, same internal account, second call's fields win
        assert_eq!(user_count(&pool).await, 1);
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(second.user.last_name.as_deref(), Some("King"));
        assert_eq!(second.user.email, "ada.king@example.com");
    }

    #[tokio::test]
    async fn test_missing_email_synthesizes_stable_placeholder() {
        let pool = test_pool().await;

        for code in ["code_1", "code_2"] {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/accessToken")
                .with_status(200)
                .with_body(TOKEN_BODY)
                .create_async()
                .await;
            server
                .mock("GET", "/userinfo")
                .with_status(200)
                .with_body(r#"{"sub":"subj_noemail","given_name":"No","family_name":"Email"}"#)
                .create_async()
                .await;

            let state = test_state(pool.clone(), &server.url());
            let csrf = state.oauth_states.generate("https://app/cb");
            let response = complete_linkedin_login(&state, callback_params(code, &csrf))
                .await
                .unwrap();

            assert_eq!(response.user.email, "subj_noemail@linkedin.temp");
        }

        assert_eq!(user_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_token_exchange_failure_skips_identity_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accessToken")
            .with_status(500)
            .with_body(r#"{"error":"server_error"}"#)
            .create_async()
            .await;
        let identity_mock = server
            .mock("GET", "/userinfo")
            .expect(0)
            .create_async()
            .await;

        let state = test_state(test_pool().await, &server.url());
        let csrf = state.oauth_states.generate("https://app/cb");

        let err = complete_linkedin_login(&state, callback_params("code_1", &csrf))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::TokenExchange(_)));
        identity_mock.assert_async().await;
        assert_eq!(user_count(&state.db).await, 0);
    }

    #[tokio::test]
    async fn test_provider_error_takes_precedence_over_missing_code() {
        let server = mockito::Server::new_async().await;
        let state = test_state(test_pool().await, &server.url());

        let params = CallbackParams {
            error: Some("access_denied".to_string()),
            ..Default::default()
        };

        let err = complete_linkedin_login(&state, params).await.unwrap_err();
        match err {
            ApiError::ProviderDenied(msg) => assert!(msg.contains("access_denied")),
            other => panic!("expected ProviderDenied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_code_checked_before_state() {
        let server = mockito::Server::new_async().await;
        let state = test_state(test_pool().await, &server.url());

        let params = CallbackParams {
            state: Some("whatever".to_string()),
            ..Default::default()
        };

        let err = complete_linkedin_login(&state, params).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCode(_)));
    }

    #[tokio::test]
    async fn test_begin_login_url_contains_state_and_registered_values() {
        let server = mockito::Server::new_async().await;
        let state = test_state(test_pool().await, &server.url());

        let csrf = state
            .oauth_states
            .generate(&state.linkedin_service.config().redirect_uri);
        let url = state.linkedin_service.authorization_url(&csrf);

        assert!(url.contains("client_id=client123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp%2Fcb"));
        assert!(csrf.len() >= 16);
        assert!(url.contains(&format!("state={}", csrf)));

        // The same state value was stored for later comparison
        let entry = state.oauth_states.consume(&csrf).expect("state stored");
        assert_eq!(entry.redirect_uri, "https://app/cb");
    }

    #[test]
    fn test_session_token_round_trip() {
        let token = issue_session_token("test_secret_key", "U_ABC123").unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret("test_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("token decodes with the issuing secret");
        assert_eq!(decoded.claims.sub, "U_ABC123");

        let wrong = decode::<Claims>(
            &token,
            &DecodingKey::from_secret("other_secret".as_bytes()),
            &Validation::new(Algorithm::HS256),
        );
        assert!(wrong.is_err(), "validation must fail with the wrong secret");
    }
}
