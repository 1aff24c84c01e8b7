use serde::de::DeserializeOwned;
use url::Url;

use super::endpoints;
use crate::config::ClientConfig;
use crate::error::{ApiErrorCode, Error};
use crate::models::{
    ApiErrorBody, AuthResponse, AuthTokens, CurrentUser, LoginRequest, Member, OAuthCallbackRequest,
    Organization, RefreshRequest, Subscription, UpgradeRequest, UserPreferences,
};
use crate::oauth::OAuthProvider;
use crate::types::{OrganizationId, PlanId};

/// `/api/v1` client.
///
/// Authenticated calls take the bearer access token as a parameter; the
/// client itself holds no session state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: config.api_base_url.clone(),
            http: builder.build()?,
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Auth ───────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the server's code on rejected credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, Error> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let request = self.http.post(self.url(endpoints::AUTH_LOGIN)?).json(&body);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn logout(&self, access_token: &str) -> Result<(), Error> {
        let request = self
            .http
            .post(self.url(endpoints::AUTH_LOGOUT)?)
            .bearer_auth(access_token);
        Self::send_empty(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the token is no longer valid.
    pub async fn current_user(&self, access_token: &str) -> Result<CurrentUser, Error> {
        let request = self
            .http
            .get(self.url(endpoints::AUTH_ME)?)
            .bearer_auth(access_token);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the refresh token was rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, Error> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_owned(),
        };
        let request = self.http.post(self.url(endpoints::AUTH_REFRESH)?).json(&body);
        Self::send_json(request).await
    }

    /// Hand a verified provider callback to the API for token exchange.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] if the exchange failed.
    pub async fn oauth_callback(
        &self,
        provider: OAuthProvider,
        request: &OAuthCallbackRequest,
    ) -> Result<AuthResponse, Error> {
        let url = self.url(&endpoints::oauth_callback(provider))?;
        Self::send_json(self.http.post(url).json(request)).await
    }

    // ── Users ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn get_preferences(&self, access_token: &str) -> Result<UserPreferences, Error> {
        let request = self
            .http
            .get(self.url(endpoints::USER_PREFERENCES)?)
            .bearer_auth(access_token);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn update_preferences(
        &self,
        access_token: &str,
        preferences: &UserPreferences,
    ) -> Result<UserPreferences, Error> {
        let request = self
            .http
            .put(self.url(endpoints::USER_PREFERENCES)?)
            .bearer_auth(access_token)
            .json(preferences);
        Self::send_json(request).await
    }

    // ── Organizations ──────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn list_organizations(&self, access_token: &str) -> Result<Vec<Organization>, Error> {
        let request = self
            .http
            .get(self.url(endpoints::ORGANIZATIONS)?)
            .bearer_auth(access_token);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn get_organization(
        &self,
        access_token: &str,
        id: &OrganizationId,
    ) -> Result<Organization, Error> {
        let request = self
            .http
            .get(self.url(&endpoints::organization(id))?)
            .bearer_auth(access_token);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn list_members(
        &self,
        access_token: &str,
        id: &OrganizationId,
    ) -> Result<Vec<Member>, Error> {
        let request = self
            .http
            .get(self.url(&endpoints::organization_members(id))?)
            .bearer_auth(access_token);
        Self::send_json(request).await
    }

    // ── Subscriptions ──────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Http`], [`Error::Unauthorized`] or [`Error::Api`].
    pub async fn get_subscription(
        &self,
        access_token: &str,
        id: &OrganizationId,
    ) -> Result<Subscription, Error> {
        let request = self
            .http
            .get(self.url(&endpoints::subscription(id))?)
            .bearer_auth(access_token);
        Self::send_json(request).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] (e.g. [`ApiErrorCode::Forbidden`]) if the upgrade was refused.
    pub async fn upgrade_plan(
        &self,
        access_token: &str,
        id: &OrganizationId,
        plan: &PlanId,
    ) -> Result<Subscription, Error> {
        let body = UpgradeRequest { plan: plan.clone() };
        let request = self
            .http
            .post(self.url(&endpoints::subscription_upgrade(id))?)
            .bearer_auth(access_token)
            .json(&body);
        Self::send_json(request).await
    }

    // ── Plumbing ───────────────────────────────────────────────────

    /// Append `path` to the base URL, keeping any path prefix the base carries.
    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
            .parse()
            .map_err(|e| Error::Config(format!("invalid API URL for {path}: {e}")))
    }

    async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, Error> {
        let response = Self::ensure_success(request.send().await?).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    async fn send_empty(request: reqwest::RequestBuilder) -> Result<(), Error> {
        Self::ensure_success(request.send().await?).await.map(drop)
    }

    /// Map 401 to [`Error::Unauthorized`] and other failures to [`Error::Api`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        let text = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &text))
    }
}

fn api_error(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|b| b.code.clone())
        .map(ApiErrorCode::from)
        .unwrap_or_else(|| default_code(status));
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().chars().take(200).collect());
    Error::Api {
        status,
        code,
        message,
    }
}

fn default_code(status: u16) -> ApiErrorCode {
    match status {
        403 => ApiErrorCode::Forbidden,
        404 => ApiErrorCode::NotFound,
        400 | 422 => ApiErrorCode::Validation,
        other => ApiErrorCode::Other(format!("http_{other}")),
    }
}
