use std::collections::HashMap;

use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use crate::guard::RouteRules;
use crate::oauth::{OAuthConfig, OAuthProvider};

/// Settings shared by the guard middleware and the auth routes.
#[derive(Clone)]
pub(crate) struct GuardSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) rules: RouteRules,
    pub(crate) providers: HashMap<OAuthProvider, OAuthConfig>,
}

impl GuardSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__tenant_session".into(),
            session_ttl_days: 14,
            secure_cookies: true,
            auth_path: "/auth".into(),
            rules: RouteRules::default(),
            providers: HashMap::new(),
        }
    }
}

/// Server-side guard configuration.
///
/// Everything has a default; register OAuth providers with
/// [`with_provider`](GuardConfig::with_provider).
pub struct GuardConfig {
    pub(super) settings: GuardSettings,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: GuardSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `COOKIE_KEY`: cookie encryption key bytes (at least 64); ephemeral if unset
    /// - `DEV_AUTH`: `"1"` or `"true"` disables the `Secure` cookie flag for local HTTP
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if `COOKIE_KEY` is set but too short.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let dev_auth = matches!(var("DEV_AUTH").as_deref(), Some("1" | "true"));

        let cookie_key = match var("COOKIE_KEY") {
            Some(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes)".into(),
                )
            })?,
            None => Key::generate(),
        };

        Ok(Self::new()
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Mount point of the login/callback/logout routes (default `/auth`).
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_route_rules(mut self, rules: RouteRules) -> Self {
        self.settings.rules = rules;
        self
    }

    #[must_use]
    pub fn with_provider(mut self, config: OAuthConfig) -> Self {
        self.settings.providers.insert(config.provider(), config);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &RouteRules {
        &self.settings.rules
    }
}
