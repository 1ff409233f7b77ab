//! Authentication routes
//!
//! Provides endpoints for registration, login, logout and the current user.
//! Successful register/login responses carry the session token in an
//! HTTP-only cookie; the body only describes the user.

use super::json::ApiJson;
use crate::auth::{clear_session_cookie, session_cookie, AuthUser};
use crate::error::ApiResult;
use crate::services::{AuthDeps, AuthSession, UserService};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use notes_hub_shared::types::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UserSummary};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

fn deps(state: &AppState) -> AuthDeps<'_> {
    AuthDeps {
        users: state.users.as_ref(),
        passwords: state.passwords(),
        jwt: state.jwt(),
    }
}

fn cookie_header(value: Result<HeaderValue, axum::http::header::InvalidHeaderValue>) -> ApiResult<HeaderValue> {
    value.map_err(|e| anyhow::anyhow!("Failed to build session cookie: {}", e).into())
}

/// Body plus `Set-Cookie` for a new session
fn session_response(state: &AppState, status: StatusCode, session: AuthSession) -> ApiResult<Response> {
    let config = &state.config().session;
    let cookie = cookie_header(session_cookie(
        &config.cookie_name,
        &session.token,
        state.jwt().ttl_secs(),
        config.secure_cookie,
    ))?;

    Ok((
        status,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse { user: session.user }),
    )
        .into_response())
}

/// Register a new user
///
/// POST /api/auth/register
///
/// # Performance
/// Password hashing is offloaded to blocking thread pool.
async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Response> {
    let session = UserService::register(deps(&state), req).await?;
    session_response(&state, StatusCode::CREATED, session)
}

/// Login with email and password
///
/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let session = UserService::login(deps(&state), req).await?;
    session_response(&state, StatusCode::OK, session)
}

/// Tell the client to drop its session cookie
///
/// POST /api/auth/logout
///
/// The token itself stays valid until it expires; nothing is revoked.
async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let config = &state.config().session;
    let cookie = cookie_header(clear_session_cookie(&config.cookie_name, config.secure_cookie))?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(MessageResponse::new("Logged out")),
    )
        .into_response())
}

/// Get the current user (requires authentication)
///
/// GET /api/auth/me
async fn me(AuthUser(identity): AuthUser) -> Json<AuthResponse> {
    Json(AuthResponse {
        user: UserSummary {
            id: identity.user_id,
            email: identity.email,
        },
    })
}
