use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

const VERIFIER_COOKIE_NAME: &str = "__tenant_oauth_verifier";
const STATE_COOKIE_NAME: &str = "__tenant_oauth_state";
const RETURN_COOKIE_NAME: &str = "__tenant_return_url";

/// Short-lived cookie scoped to the auth routes.
fn flow_cookie(name: &'static str, value: &str, secure: bool, auth_path: &str) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(Duration::minutes(10))
        .build()
}

fn removal(name: &'static str, path: &str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path(path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// PKCE verifier, `state` and post-login target for one provider round trip.
pub(super) fn oauth_flow_cookies(
    code_verifier: &str,
    state: &str,
    return_url: &str,
    secure: bool,
    auth_path: &str,
) -> [Cookie<'static>; 3] {
    [
        flow_cookie(VERIFIER_COOKIE_NAME, code_verifier, secure, auth_path),
        flow_cookie(STATE_COOKIE_NAME, state, secure, auth_path),
        flow_cookie(RETURN_COOKIE_NAME, return_url, secure, auth_path),
    ]
}

pub(super) fn clear_oauth_flow_cookies(auth_path: &str) -> [Cookie<'static>; 3] {
    [
        removal(VERIFIER_COOKIE_NAME, auth_path),
        removal(STATE_COOKIE_NAME, auth_path),
        removal(RETURN_COOKIE_NAME, auth_path),
    ]
}

pub(super) fn session_cookie(
    name: &str,
    session_id: &str,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(ttl_days))
        .build()
}

pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

pub(super) fn get_verifier(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(VERIFIER_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(super) fn get_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(super) fn get_return_url(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(RETURN_COOKIE_NAME).map(|c| c.value().to_string())
}
