//! Authentication extractors
//!
//! `AuthUser` rejects unauthenticated requests with 401; `MaybeAuthUser`
//! never rejects for authentication reasons. Both store the resolved
//! identity in the request extensions so it is resolved at most once per
//! request.

use super::session::ResolvedIdentity;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::FromRef, http::request::Parts};

/// Authenticated caller; handlers taking this require a session
#[derive(Debug, Clone)]
pub struct AuthUser(pub ResolvedIdentity);

/// Caller identity when a valid session is presented
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<ResolvedIdentity>);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<ResolvedIdentity>() {
            return Ok(AuthUser(identity.clone()));
        }

        let app_state = AppState::from_ref(state);
        let identity = app_state.sessions().resolve(&*parts).await?;

        parts.extensions.insert(identity.clone());
        Ok(AuthUser(identity))
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<ResolvedIdentity>() {
            return Ok(MaybeAuthUser(Some(identity.clone())));
        }

        let app_state = AppState::from_ref(state);
        let identity = app_state.sessions().resolve_optional(&*parts).await?;

        if let Some(identity) = &identity {
            parts.extensions.insert(identity.clone());
        }
        Ok(MaybeAuthUser(identity))
    }
}
