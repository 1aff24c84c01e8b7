//! `/api/v1` endpoint paths.

use crate::oauth::OAuthProvider;
use crate::types::OrganizationId;

pub const API_PREFIX: &str = "/api/v1";

pub const AUTH_LOGIN: &str = "/api/v1/auth/login";
pub const AUTH_LOGOUT: &str = "/api/v1/auth/logout";
pub const AUTH_ME: &str = "/api/v1/auth/me";
pub const AUTH_REFRESH: &str = "/api/v1/auth/refresh";

pub const USER_PREFERENCES: &str = "/api/v1/users/me/preferences";

pub const ORGANIZATIONS: &str = "/api/v1/organizations";

#[must_use]
pub fn oauth_callback(provider: OAuthProvider) -> String {
    format!("{API_PREFIX}/auth/oauth/{}/callback", provider.slug())
}

#[must_use]
pub fn organization(id: &OrganizationId) -> String {
    format!("{ORGANIZATIONS}/{}", urlencoding::encode(&id.0))
}

#[must_use]
pub fn organization_members(id: &OrganizationId) -> String {
    format!("{}/members", organization(id))
}

#[must_use]
pub fn subscription(id: &OrganizationId) -> String {
    format!("{API_PREFIX}/subscriptions/{}", urlencoding::encode(&id.0))
}

#[must_use]
pub fn subscription_upgrade(id: &OrganizationId) -> String {
    format!("{}/upgrade", subscription(id))
}
