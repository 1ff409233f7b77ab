//! Session resolution
//!
//! Turns the credentials carried by a request into a `ResolvedIdentity`, or
//! a rejection. The resolver only sees the request through `RequestContext`,
//! so it does not depend on the HTTP framework.

use super::cookie::cookie_value;
use super::jwt::{JwtService, TokenError};
use crate::repositories::{CredentialStore, StoreError, UserRecord};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const BEARER_PREFIX: &str = "Bearer ";

/// Read access to the parts of a request that can carry a session
pub trait RequestContext {
    fn cookie(&self, name: &str) -> Option<String>;
    fn header(&self, name: &str) -> Option<String>;
}

impl RequestContext for HeaderMap {
    fn cookie(&self, name: &str) -> Option<String> {
        cookie_value(self, name)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

impl RequestContext for Parts {
    fn cookie(&self, name: &str) -> Option<String> {
        self.headers.cookie(name)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.header(name)
    }
}

/// Authenticated caller attached to a single request
///
/// Carries no password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: Uuid,
    pub email: String,
}

impl From<UserRecord> for ResolvedIdentity {
    fn from(user: UserRecord) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
        }
    }
}

/// Why a request was not authenticated
///
/// Logged server side; callers only ever see a generic 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("no session token presented")]
    MissingToken,

    #[error("session token failed verification")]
    InvalidToken,

    #[error("session token expired")]
    ExpiredToken,

    #[error("session subject does not exist")]
    UnknownSubject,
}

impl AuthRejection {
    /// Metric label
    pub fn as_str(self) -> &'static str {
        match self {
            AuthRejection::MissingToken => "missing_token",
            AuthRejection::InvalidToken => "invalid_token",
            AuthRejection::ExpiredToken => "expired_token",
            AuthRejection::UnknownSubject => "unknown_subject",
        }
    }
}

/// Failure to resolve a session
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Rejected(#[from] AuthRejection),

    #[error("credential lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Resolves session tokens to identities
///
/// Cheap to clone; holds the token codec and a handle to the credential
/// store.
#[derive(Clone)]
pub struct SessionResolver {
    jwt: JwtService,
    users: Arc<dyn CredentialStore>,
    cookie_name: Arc<str>,
}

impl SessionResolver {
    pub fn new(jwt: JwtService, users: Arc<dyn CredentialStore>, cookie_name: &str) -> Self {
        Self {
            jwt,
            users,
            cookie_name: Arc::from(cookie_name),
        }
    }

    /// Name of the session cookie
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Session token from the cookie, falling back to a bearer header
    pub fn extract_token<C: RequestContext + ?Sized>(&self, ctx: &C) -> Option<String> {
        ctx.cookie(&self.cookie_name).or_else(|| {
            ctx.header(AUTHORIZATION.as_str())
                .and_then(|value| value.strip_prefix(BEARER_PREFIX).map(str::to_string))
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
        })
    }

    /// Resolve the caller or reject
    pub async fn resolve<C>(&self, ctx: &C) -> Result<ResolvedIdentity, ResolveError>
    where
        C: RequestContext + Sync + ?Sized,
    {
        let outcome = self.resolve_inner(ctx).await;
        if let Err(ResolveError::Rejected(reason)) = &outcome {
            debug!(reason = %reason, "Request not authenticated");
            metrics::counter!("auth_guard_rejections_total", "reason" => reason.as_str())
                .increment(1);
        }
        outcome
    }

    async fn resolve_inner<C>(&self, ctx: &C) -> Result<ResolvedIdentity, ResolveError>
    where
        C: RequestContext + Sync + ?Sized,
    {
        let token = self.extract_token(ctx).ok_or(AuthRejection::MissingToken)?;

        let claims = self.jwt.verify(&token).map_err(|e| match e {
            TokenError::Expired => AuthRejection::ExpiredToken,
            _ => AuthRejection::InvalidToken,
        })?;

        let user_id = claims.subject().ok_or(AuthRejection::InvalidToken)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthRejection::UnknownSubject)?;

        Ok(user.into())
    }

    /// Resolve the caller when possible
    ///
    /// Rejections become `None` and are neither logged nor counted; only
    /// storage failures are errors. Used by routes where identity is
    /// informational.
    pub async fn resolve_optional<C>(&self, ctx: &C) -> Result<Option<ResolvedIdentity>, StoreError>
    where
        C: RequestContext + Sync + ?Sized,
    {
        match self.resolve_inner(ctx).await {
            Ok(identity) => Ok(Some(identity)),
            Err(ResolveError::Rejected(_)) => Ok(None),
            Err(ResolveError::Store(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use crate::repositories::MemoryCredentialStore;
    use axum::http::HeaderValue;
    use chrono::{TimeZone, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use secrecy::SecretString;

    const TTL: i64 = 7 * 24 * 60 * 60;

    fn jwt() -> JwtService {
        JwtService::new(&SecretString::new("test-secret".to_string()), TTL)
    }

    async fn setup() -> (SessionResolver, Arc<MemoryCredentialStore>, UserRecord) {
        let store = Arc::new(MemoryCredentialStore::new());
        let user = store.insert("alice@example.com", "hash").await.unwrap();
        let resolver = SessionResolver::new(jwt(), store.clone(), "token");
        (resolver, store, user)
    }

    fn with_cookie(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_str(&format!("token={}", token)).unwrap(),
        );
        headers
    }

    fn with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn rejection(result: Result<ResolvedIdentity, ResolveError>) -> AuthRejection {
        match result {
            Err(ResolveError::Rejected(reason)) => reason,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolves_from_cookie() {
        let (resolver, _, user) = setup().await;
        let token = jwt().issue(user.id).unwrap();

        let identity = resolver.resolve(&with_cookie(&token)).await.unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_resolves_from_bearer_header() {
        let (resolver, _, user) = setup().await;
        let token = jwt().issue(user.id).unwrap();

        let identity = resolver.resolve(&with_bearer(&token)).await.unwrap();
        assert_eq!(identity.user_id, user.id);
    }

    #[tokio::test]
    async fn test_cookie_takes_precedence_over_header() {
        let (resolver, store, user) = setup().await;
        let other = store.insert("bob@example.com", "hash").await.unwrap();

        let mut headers = with_cookie(&jwt().issue(user.id).unwrap());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", jwt().issue(other.id).unwrap())).unwrap(),
        );

        let identity = resolver.resolve(&headers).await.unwrap();
        assert_eq!(identity.user_id, user.id);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let (resolver, _, _) = setup().await;
        assert_eq!(
            rejection(resolver.resolve(&HeaderMap::new()).await),
            AuthRejection::MissingToken
        );

        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(
            rejection(resolver.resolve(&basic).await),
            AuthRejection::MissingToken
        );
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let (resolver, _, _) = setup().await;
        assert_eq!(
            rejection(resolver.resolve(&with_bearer("invalid.token.here")).await),
            AuthRejection::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (resolver, _, user) = setup().await;
        let long_ago = Utc.timestamp_opt(1_000_000_000, 0).unwrap();
        let old = JwtService::with_clock(
            &SecretString::new("test-secret".to_string()),
            TTL,
            Arc::new(FixedClock(long_ago)),
        );
        let token = old.issue(user.id).unwrap();

        assert_eq!(
            rejection(resolver.resolve(&with_cookie(&token)).await),
            AuthRejection::ExpiredToken
        );
    }

    #[tokio::test]
    async fn test_deleted_user_rejected() {
        let (resolver, store, user) = setup().await;
        let token = jwt().issue(user.id).unwrap();
        store.remove(user.id).await;

        assert_eq!(
            rejection(resolver.resolve(&with_cookie(&token)).await),
            AuthRejection::UnknownSubject
        );
    }

    #[tokio::test]
    async fn test_resolve_optional_swallows_rejections() {
        let (resolver, _, user) = setup().await;

        assert!(resolver
            .resolve_optional(&with_bearer("garbage"))
            .await
            .unwrap()
            .is_none());

        let token = jwt().issue(user.id).unwrap();
        let identity = resolver.resolve_optional(&with_bearer(&token)).await.unwrap();
        assert_eq!(identity.map(|i| i.user_id), Some(user.id));
    }

    fn count_rejections<F>(run: F) -> String
    where
        F: FnOnce(&tokio::runtime::Runtime),
    {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            run(&rt);
        });
        handle.render()
    }

    #[test]
    fn test_only_guarded_rejections_are_counted() {
        let rendered = count_rejections(|rt| {
            rt.block_on(async {
                let (resolver, _, _) = setup().await;
                for _ in 0..3 {
                    let identity = resolver.resolve_optional(&HeaderMap::new()).await.unwrap();
                    assert!(identity.is_none());
                }
                assert!(resolver.resolve(&HeaderMap::new()).await.is_err());
            })
        });

        assert!(rendered.contains(r#"auth_guard_rejections_total{reason="missing_token"} 1"#));
    }

    #[test]
    fn test_optional_resolution_leaves_counter_untouched() {
        let rendered = count_rejections(|rt| {
            rt.block_on(async {
                let (resolver, _, _) = setup().await;
                resolver.resolve_optional(&with_bearer("garbage")).await.unwrap();
            })
        });

        assert!(!rendered.contains("auth_guard_rejections_total"));
    }
}
