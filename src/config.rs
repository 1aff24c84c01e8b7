use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::guard::RouteRules;
use crate::types::Locale;

/// Client configuration.
///
/// The API base URL is the only required value. Use [`from_env()`](ClientConfig::from_env)
/// for convention-based setup, or [`new()`](ClientConfig::new) with `with_*` methods.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) api_base_url: Url,
    pub(crate) timeout: Option<Duration>,
    pub(crate) default_locale: Locale,
    pub(crate) preferences_path: Option<PathBuf>,
    pub(crate) route_rules: RouteRules,
}

impl ClientConfig {
    /// HTTP timeouts stay at the HTTP client's defaults unless overridden.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            timeout: None,
            default_locale: Locale::default(),
            preferences_path: None,
            route_rules: RouteRules::default(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `API_BASE_URL`: origin of the `/api/v1` API
    ///
    /// # Optional env vars
    /// - `API_TIMEOUT_SECS`: request timeout in seconds
    /// - `APP_DEFAULT_LOCALE`: locale used when none is persisted (default `en`)
    /// - `APP_PREFERENCES_PATH`: JSON file for persisted preferences (in-memory if unset)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is missing or malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env()`](ClientConfig::from_env) over an arbitrary variable source.
    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base = var("API_BASE_URL")
            .ok_or_else(|| Error::Config("API_BASE_URL is required".into()))?;
        let base: Url = base
            .parse()
            .map_err(|e| Error::Config(format!("API_BASE_URL: {e}")))?;

        let mut config = Self::new(base);

        if let Some(secs) = var("API_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("API_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(locale) = var("APP_DEFAULT_LOCALE") {
            let locale: Locale = locale
                .parse()
                .map_err(|e| Error::Config(format!("APP_DEFAULT_LOCALE: {e}")))?;
            config = config.with_default_locale(locale);
        }
        if let Some(path) = var("APP_PREFERENCES_PATH") {
            config = config.with_preferences_path(path);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_default_locale(mut self, locale: Locale) -> Self {
        self.default_locale = locale;
        self
    }

    #[must_use]
    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_route_rules(mut self, rules: RouteRules) -> Self {
        self.route_rules = rules;
        self
    }

    #[must_use]
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn default_locale(&self) -> &Locale {
        &self.default_locale
    }

    #[must_use]
    pub fn preferences_path(&self) -> Option<&PathBuf> {
        self.preferences_path.as_ref()
    }

    #[must_use]
    pub fn route_rules(&self) -> &RouteRules {
        &self.route_rules
    }
}
