//! Property-based tests for the session guard
//!
//! Any request to a protected endpoint without a valid session must get
//! the same 401 response, whatever was wrong with its credentials.

#[cfg(test)]
mod tests {
    use crate::auth::{FixedClock, JwtService};
    use crate::config::{AppConfig, PasswordConfig};
    use crate::repositories::CredentialStore;
    use crate::routes::create_router;
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use secrecy::SecretString;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            password: PasswordConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            ..AppConfig::default()
        }
    }

    fn create_test_state() -> AppState {
        AppState::in_memory(test_config()).unwrap()
    }

    /// Generate random invalid tokens
    fn invalid_token_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            // Empty token
            Just("".to_string()),
            // Random string (not a valid JWT)
            "[a-zA-Z0-9]{10,50}",
            // Malformed JWT (wrong number of parts)
            "[a-zA-Z0-9]{10}\\.[a-zA-Z0-9]{10}",
            // Valid format but invalid signature
            "[a-zA-Z0-9_-]{20}\\.[a-zA-Z0-9_-]{20}\\.[a-zA-Z0-9_-]{20}",
        ]
    }

    /// A request to /api/auth/me carrying some broken credential
    #[derive(Debug, Clone)]
    enum BadCredential {
        Nothing,
        Header(String),
        Cookie(String),
    }

    fn bad_credential_strategy() -> impl Strategy<Value = BadCredential> {
        prop_oneof![
            Just(BadCredential::Nothing),
            // Missing Bearer prefix
            invalid_token_strategy().prop_map(BadCredential::Header),
            // Wrong prefix
            invalid_token_strategy().prop_map(|t| BadCredential::Header(format!("Basic {}", t))),
            // Bearer with invalid token
            invalid_token_strategy().prop_map(|t| BadCredential::Header(format!("Bearer {}", t))),
            // Cookie with invalid token
            invalid_token_strategy().prop_map(BadCredential::Cookie),
        ]
    }

    async fn me_with(state: AppState, credential: BadCredential) -> (StatusCode, String) {
        let app = create_router(state);
        let mut builder = Request::builder().uri("/api/auth/me").method("GET");

        match credential {
            BadCredential::Nothing => {}
            BadCredential::Header(value) => builder = builder.header("Authorization", value),
            BadCredential::Cookie(value) => builder = builder.header("Cookie", format!("token={}", value)),
        }

        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn me_with_bearer(state: AppState, token: &str) -> (StatusCode, String) {
        me_with(state, BadCredential::Header(format!("Bearer {}", token))).await
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: Unauthenticated requests to protected endpoints return 401
        #[test]
        fn prop_unauthenticated_requests_return_401(
            credential in bad_credential_strategy()
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (status, body) = me_with(create_test_state(), credential).await;

                // All invalid auth should return the same 401
                prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
                prop_assert_eq!(body, r#"{"message":"Not authenticated"}"#);

                Ok(())
            })?;
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_401() {
        let (status, _) = me_with(create_test_state(), BadCredential::Nothing).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_with_wrong_secret_returns_401() {
        let state = create_test_state();
        let user = state.users.insert("alice@example.com", "hash").await.unwrap();

        // Create a JWT service with a DIFFERENT secret
        let other = JwtService::new(&SecretString::new("wrong-secret-key".to_string()), 3600);
        let token = other.issue(user.id).unwrap();

        let (status, _) = me_with_bearer(state, &token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_returns_same_401() {
        let state = create_test_state();
        let user = state.users.insert("alice@example.com", "hash").await.unwrap();

        let issued_long_ago = JwtService::with_clock(
            &state.config().jwt.secret,
            state.config().jwt.token_ttl_secs,
            Arc::new(FixedClock(Utc::now() - Duration::days(8))),
        );
        let token = issued_long_ago.issue(user.id).unwrap();

        let (expired_status, expired_body) = me_with_bearer(state.clone(), &token).await;
        let (garbage_status, garbage_body) = me_with_bearer(state, "garbage").await;

        assert_eq!(expired_status, StatusCode::UNAUTHORIZED);
        assert_eq!(expired_status, garbage_status);
        assert_eq!(expired_body, garbage_body);
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_returns_401() {
        let state = create_test_state();
        let token = state.jwt().issue(uuid::Uuid::new_v4()).unwrap();

        let (status, _) = me_with_bearer(state, &token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_passes_auth() {
        let state = create_test_state();
        let user = state.users.insert("alice@example.com", "hash").await.unwrap();
        let token = state.jwt().issue(user.id).unwrap();

        let (status, body) = me_with_bearer(state, &token).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("alice@example.com"));
    }

    #[tokio::test]
    async fn test_valid_cookie_passes_auth() {
        let state = create_test_state();
        let user = state.users.insert("alice@example.com", "hash").await.unwrap();
        let token = state.jwt().issue(user.id).unwrap();

        let (status, _) = me_with(state, BadCredential::Cookie(token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cookie_wins_over_header() {
        let state = create_test_state();
        let user = state.users.insert("alice@example.com", "hash").await.unwrap();
        let token = state.jwt().issue(user.id).unwrap();

        let request = Request::builder()
            .uri("/api/auth/me")
            .header("Cookie", "token=not-a-token")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
