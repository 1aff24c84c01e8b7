//! Service layer: API calls that read and write the session store.

use std::future::Future;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ApiErrorCode, Error};
use crate::guard::{GuardDecision, RouteRules};
use crate::inflight::InFlight;
use crate::models::{AuthTokens, CurrentUser, Member, OAuthCallbackRequest, UserPreferences};
use crate::oauth::{CallbackParams, OAuthProvider};
use crate::permissions::Permissions;
use crate::preferences::{
    FilePreferences, LOCALE_KEY, MemoryPreferences, ORGANIZATION_KEY, PreferenceStore,
};
use crate::session::{SessionStore, Snapshot};
use crate::types::{Locale, OrganizationId, PlanId};

/// Result of a password login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    /// Credentials were accepted but the account must set a new password first.
    PasswordChangeRequired,
}

/// What the OAuth callback needs besides the query parameters.
#[derive(Debug, Clone)]
pub struct PendingOAuth {
    pub state: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

const CURRENT_USER: &str = "current_user";
const PREFERENCES: &str = "preferences";

#[derive(Clone)]
pub struct SessionManager {
    client: ApiClient,
    store: Arc<SessionStore>,
    preferences: Arc<dyn PreferenceStore>,
    rules: RouteRules,
    default_locale: Locale,
    bootstrap_flight: InFlight<&'static str, bool>,
    members_flight: InFlight<OrganizationId, Result<Vec<Member>, Error>>,
    preferences_flight: InFlight<&'static str, UserPreferences>,
}

impl SessionManager {
    /// Build from config. Preferences go to `preferences_path` when set, memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let preferences: Arc<dyn PreferenceStore> = match &config.preferences_path {
            Some(path) => Arc::new(FilePreferences::open(path)),
            None => Arc::new(MemoryPreferences::new()),
        };
        Ok(Self {
            client: ApiClient::new(config)?,
            store: Arc::new(SessionStore::new()),
            preferences,
            rules: config.route_rules.clone(),
            default_locale: config.default_locale.clone(),
            bootstrap_flight: InFlight::new(),
            members_flight: InFlight::new(),
            preferences_flight: InFlight::new(),
        })
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = preferences;
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: ApiClient) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    #[must_use]
    pub fn preferences(&self) -> &dyn PreferenceStore {
        self.preferences.as_ref()
    }

    #[must_use]
    pub fn rules(&self) -> &RouteRules {
        &self.rules
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    #[must_use]
    pub fn permissions(&self) -> Permissions {
        self.store.permissions()
    }

    /// Guard decision for `path` given the current session.
    #[must_use]
    pub fn route(&self, path: &str) -> GuardDecision {
        self.rules.decide(self.store.guard_input(), path)
    }

    // ── Session lifecycle ──────────────────────────────────────────

    /// Populate the session from `GET /auth/me` using previously issued tokens.
    ///
    /// Concurrent calls share one request. Any failure leaves the session
    /// cleared: an unverifiable session is treated as signed out. Returns
    /// whether the user ended up authenticated.
    pub async fn bootstrap(&self, tokens: Option<AuthTokens>) -> bool {
        self.bootstrap_flight
            .run(CURRENT_USER, || async move {
                let _loading = self.store.begin_loading();
                let Some(tokens) = tokens else {
                    self.store.clear();
                    return false;
                };

                match self.client.current_user(&tokens.access_token).await {
                    Ok(me) => {
                        self.apply_current_user(me, tokens).await;
                        true
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "Current user unavailable, continuing signed out");
                        self.store.clear();
                        false
                    }
                }
            })
            .await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the API error for rejected credentials, or any error from
    /// loading the current user afterwards.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, Error> {
        let _loading = self.store.begin_loading();
        self.login_inner(email, password).await
    }

    async fn login_inner(&self, email: &str, password: &str) -> Result<LoginOutcome, Error> {
        let auth = match self.client.login(email, password).await {
            Ok(auth) => auth,
            Err(Error::Api {
                code: ApiErrorCode::PasswordChangeRequired,
                ..
            }) => {
                tracing::info!("Login requires a password change");
                return Ok(LoginOutcome::PasswordChangeRequired);
            }
            Err(e) => return Err(e),
        };

        let me = self.client.current_user(&auth.tokens.access_token).await?;
        self.apply_current_user(me, auth.tokens).await;
        tracing::info!(user_id = %auth.user.id, "Login successful");
        Ok(LoginOutcome::Authenticated)
    }

    /// Finish a provider sign-in: verify the redirect, let the API exchange the code,
    /// then load the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OAuth`] if the callback does not verify, or the API error
    /// if the exchange or user load fails. The session is left signed out on failure.
    pub async fn complete_oauth(
        &self,
        provider: OAuthProvider,
        params: &CallbackParams,
        pending: &PendingOAuth,
    ) -> Result<(), Error> {
        let _loading = self.store.begin_loading();
        let result = async {
            let code = params.verify(provider, Some(pending.state.as_str()))?;
            let request = OAuthCallbackRequest {
                code: code.to_owned(),
                state: pending.state.clone(),
                redirect_uri: pending.redirect_uri.clone(),
                code_verifier: Some(pending.code_verifier.clone()),
            };
            let auth = self.client.oauth_callback(provider, &request).await?;
            let me = self.client.current_user(&auth.tokens.access_token).await?;
            self.apply_current_user(me, auth.tokens).await;
            Ok::<_, Error>(())
        }
        .await;

        match &result {
            Ok(()) => tracing::info!(provider = %provider, "OAuth login successful"),
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "OAuth login failed");
                self.store.clear();
            }
        }
        result
    }

    /// Exchange the refresh token for new tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] (and clears the session) if there is no
    /// refresh token or the API rejected it.
    pub async fn refresh_tokens(&self) -> Result<(), Error> {
        let refresh = self
            .store
            .snapshot()
            .session
            .tokens()
            .and_then(|t| t.refresh_token.clone());
        let Some(refresh) = refresh else {
            self.store.clear();
            return Err(Error::Unauthorized);
        };
        match self.client.refresh(&refresh).await {
            Ok(tokens) => {
                self.store.set_tokens(tokens);
                Ok(())
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.store.clear();
                }
                Err(e)
            }
        }
    }

    /// Sign out. The local session is always cleared, even if the API call fails.
    pub async fn logout(&self) {
        if let Some(token) = self.store.access_token() {
            if let Err(e) = self.client.logout(&token).await {
                tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
            }
        }
        self.store.clear();
        if let Err(e) = self.preferences.remove(ORGANIZATION_KEY) {
            tracing::warn!(error = %e, "Could not forget current organization");
        }
        tracing::info!("Logged out");
    }

    // ── Organizations ──────────────────────────────────────────────

    /// Make `id` the current organization. Members and features of the previous
    /// one are dropped; features of the new one are loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOrganization`] if the user is not a member of `id`.
    pub async fn switch_organization(&self, id: &OrganizationId) -> Result<(), Error> {
        if !self.store.select_organization(id) {
            return Err(Error::UnknownOrganization(id.to_string()));
        }
        self.persist(ORGANIZATION_KEY, id.0.as_str());
        tracing::info!(organization_id = %id, "Switched organization");
        self.refresh_features().await;
        Ok(())
    }

    /// Load the member list of the current organization.
    ///
    /// Concurrent calls for the same organization share one request.
    ///
    /// # Errors
    ///
    /// Returns the API error; [`Error::Unauthorized`] also clears the session.
    pub async fn load_members(&self) -> Result<Vec<Member>, Error> {
        let Some(id) = self.store.current_organization_id() else {
            return Ok(Vec::new());
        };
        let members = self
            .members_flight
            .run(id.clone(), || {
                self.authed(|token| {
                    let id = id.clone();
                    async move { self.client.list_members(&token, &id).await }
                })
            })
            .await?;
        self.store.set_members(&id, members.clone());
        Ok(members)
    }

    /// Reload the current organization's feature set from its subscription.
    ///
    /// A failure leaves the feature set empty, so gated content stays hidden.
    pub async fn refresh_features(&self) {
        let Some(id) = self.store.current_organization_id() else {
            return;
        };
        let result = self
            .authed(|token| {
                let id = id.clone();
                async move { self.client.get_subscription(&token, &id).await }
            })
            .await;
        match result {
            Ok(subscription) => self.store.set_features(&id, subscription.features),
            Err(e) => {
                tracing::warn!(organization_id = %id, error = %e, "Could not load plan features");
            }
        }
    }

    /// Move the current organization to `plan` and pick up the new feature set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOrganization`] without a current organization, or the API error.
    pub async fn upgrade_plan(&self, plan: &PlanId) -> Result<(), Error> {
        let id = self
            .store
            .current_organization_id()
            .ok_or_else(|| Error::UnknownOrganization(String::new()))?;
        let subscription = self
            .authed(|token| {
                let id = id.clone();
                async move { self.client.upgrade_plan(&token, &id, plan).await }
            })
            .await?;
        tracing::info!(organization_id = %id, plan = %subscription.plan, "Plan upgraded");
        self.store.set_features(&id, subscription.features);
        Ok(())
    }

    // ── Preferences ────────────────────────────────────────────────

    /// Fetch the user's settings. Concurrent calls share one request; failures
    /// fall back to defaults.
    pub async fn load_preferences(&self) -> UserPreferences {
        self.preferences_flight
            .run(PREFERENCES, || async {
                match self
                    .authed(|token| async move { self.client.get_preferences(&token).await })
                    .await
                {
                    Ok(prefs) => prefs,
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not load preferences, using defaults");
                        UserPreferences {
                            locale: self.locale(),
                            ..UserPreferences::default()
                        }
                    }
                }
            })
            .await
    }

    /// # Errors
    ///
    /// Returns the API error; [`Error::Unauthorized`] also clears the session.
    pub async fn save_preferences(&self, prefs: &UserPreferences) -> Result<UserPreferences, Error> {
        let saved = self
            .authed(|token| async move { self.client.update_preferences(&token, prefs).await })
            .await?;
        self.persist(LOCALE_KEY, saved.locale.as_str());
        Ok(saved)
    }

    /// Persisted locale, or the configured default.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.preferences
            .get(LOCALE_KEY)
            .and_then(|l| l.parse().ok())
            .unwrap_or_else(|| self.default_locale.clone())
    }

    /// # Errors
    ///
    /// Returns [`Error::Preferences`] if the locale could not be stored.
    pub fn set_locale(&self, locale: &Locale) -> Result<(), Error> {
        self.preferences.set(LOCALE_KEY, locale.as_str())
    }

    // ── Helpers ────────────────────────────────────────────────────

    /// Run an authenticated call. A 401 clears the whole session.
    async fn authed<T, F, Fut>(&self, call: F) -> Result<T, Error>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let Some(token) = self.store.access_token() else {
            return Err(Error::Unauthorized);
        };
        let result = call(token).await;
        if matches!(result, Err(Error::Unauthorized)) {
            tracing::warn!("Access token rejected, clearing session");
            self.store.clear();
        }
        result
    }

    async fn apply_current_user(&self, me: CurrentUser, tokens: AuthTokens) {
        let CurrentUser {
            user,
            memberships,
            current_organization_id,
        } = me;

        let persisted = self.preferences.get(ORGANIZATION_KEY).map(OrganizationId::from);
        let is_member = |id: &OrganizationId| memberships.iter().any(|m| &m.organization.id == id);
        let chosen = persisted
            .filter(|id| is_member(id))
            .or(current_organization_id.filter(|id| is_member(id)))
            .or_else(|| memberships.first().map(|m| m.organization.id.clone()));

        self.store.set_authenticated(user, tokens);
        self.store.set_memberships(memberships);

        if let Some(id) = chosen {
            self.store.select_organization(&id);
            self.persist(ORGANIZATION_KEY, id.0.as_str());
            self.refresh_features().await;
        }
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.preferences.set(key, value) {
            tracing::warn!(key, error = %e, "Could not persist preference");
        }
    }
}
