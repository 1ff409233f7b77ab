//! Session cookie parsing and `Set-Cookie` construction

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

/// Value of cookie `name` from the request's `Cookie` headers
///
/// Empty values count as absent.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn build(name: &str, value: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// `Set-Cookie` value carrying a freshly issued token
///
/// `Max-Age` equals the token lifetime, so the browser drops the cookie when
/// the token would stop verifying anyway.
pub fn session_cookie(
    name: &str,
    token: &str,
    max_age_secs: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build(name, token, max_age_secs, secure)
}

/// `Set-Cookie` value instructing the client to discard its session
pub fn clear_session_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    build(name, "", 0, secure)
}
