use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header::USER_AGENT};
use axum::response::Redirect;
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::config::GuardConfig;
use super::cookies;
use super::error::AuthError;
use super::layer::resolve_session;
use super::state::GuardState;
use super::traits::SessionResolver;
use super::types::NewSession;
use crate::api::ApiClient;
use crate::features::FeatureSet;
use crate::models::{AuthResponse, CurrentUser, OAuthCallbackRequest};
use crate::oauth::{CallbackParams, OAuthProvider};
use crate::permissions::Role;
use crate::types::OrganizationId;

/// Create the sign-in router: provider login, provider callback and logout.
///
/// The API performs the actual code exchange; this router only carries the
/// browser through the redirects and keeps the resulting tokens server-side.
pub fn auth_routes<S: SessionResolver>(
    config: &GuardConfig,
    api: ApiClient,
    resolver: Arc<S>,
) -> Router {
    let auth_path = config.settings.auth_path.clone();

    let state = GuardState {
        api: Arc::new(api),
        resolver,
        settings: Arc::new(config.settings.clone()),
    };

    Router::new()
        .route(
            &format!("{auth_path}/oauth/{{provider}}/login"),
            get(oauth_login::<S>),
        )
        .route(
            &format!("{auth_path}/oauth/{{provider}}/callback"),
            get(oauth_callback::<S>),
        )
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<S>).post(logout::<S>),
        )
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginParams {
    #[serde(rename = "returnUrl")]
    return_url: Option<String>,
}

async fn oauth_login<S: SessionResolver>(
    State(state): State<GuardState<S>>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
    Query(params): Query<LoginParams>,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let rules = &state.settings.rules;
    let provider = parse_provider(&provider, rules.login_path())?;
    let Some(config) = state.settings.providers.get(&provider) else {
        tracing::warn!(provider = %provider, "Login requested for unconfigured provider");
        return Err(AuthError::sign_in(rules.login_path(), "provider_not_configured"));
    };

    let auth_req = config.authorization_url();
    let return_url = rules.sanitize_return_url(params.return_url.as_deref());

    let [verifier, oauth_state, target] = cookies::oauth_flow_cookies(
        &auth_req.code_verifier,
        &auth_req.state,
        &return_url,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    Ok((
        jar.add(verifier).add(oauth_state).add(target),
        Redirect::to(&auth_req.url),
    ))
}

// ── Callback ───────────────────────────────────────────────────────

async fn oauth_callback<S: SessionResolver>(
    State(state): State<GuardState<S>>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let login_path = state.settings.rules.login_path().to_owned();
    let provider = parse_provider(&provider, &login_path)?;
    let config = state
        .settings
        .providers
        .get(&provider)
        .ok_or_else(|| AuthError::sign_in(&login_path, "provider_not_configured"))?;

    let stored_state = cookies::get_state(&jar);
    let code = params
        .verify(provider, stored_state.as_deref())
        .map_err(|e| {
            tracing::warn!(error = %e, "OAuth callback rejected");
            AuthError::sign_in(&login_path, callback_error_code(&params))
        })?;

    let code_verifier = cookies::get_verifier(&jar)
        .ok_or_else(|| AuthError::sign_in(&login_path, "missing_verifier"))?;

    let request = OAuthCallbackRequest {
        code: code.to_owned(),
        state: stored_state.unwrap_or_default(),
        redirect_uri: config.redirect_uri().to_string(),
        code_verifier: Some(code_verifier),
    };

    let AuthResponse { user, tokens } = state
        .api
        .oauth_callback(provider, &request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            AuthError::sign_in(&login_path, "token_exchange_failed")
        })?;

    let me = state.api.current_user(&tokens.access_token).await.map_err(|e| {
        tracing::error!(error = %e, "Current user request failed");
        AuthError::sign_in(&login_path, "current_user_failed")
    })?;

    let (organization_id, role) = pick_organization(&me);
    let features = match &organization_id {
        Some(id) => match state.api.get_subscription(&tokens.access_token, id).await {
            Ok(subscription) => subscription.features,
            Err(e) => {
                tracing::warn!(organization_id = %id, error = %e, "Could not load plan features");
                FeatureSet::default()
            }
        },
        None => FeatureSet::default(),
    };

    let session = NewSession {
        user,
        tokens,
        organization_id,
        role,
        features,
        user_agent: extract_user_agent(&headers),
        ip_address: extract_client_ip(&headers),
    };

    let session_id = state.resolver.create(session).await.map_err(|e| {
        tracing::error!(error = %e, "Session creation failed");
        AuthError::sign_in(&login_path, "session_failed")
    })?;

    let target = state
        .settings
        .rules
        .sanitize_return_url(cookies::get_return_url(&jar).as_deref());

    let mut jar = jar.add(cookies::session_cookie(
        &state.settings.session_cookie_name,
        &session_id,
        state.settings.session_ttl_days,
        state.settings.secure_cookies,
    ));
    for cookie in cookies::clear_oauth_flow_cookies(&state.settings.auth_path) {
        jar = jar.remove(cookie);
    }

    tracing::info!(session_id = %session_id, provider = %provider, "OAuth login successful");

    Ok((jar, Redirect::to(&target)))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: SessionResolver>(
    State(state): State<GuardState<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if let Some(session) = resolve_session(&state, &jar).await {
        if let Err(e) = state.api.logout(&session.tokens.access_token).await {
            tracing::warn!(error = %e, "API logout failed");
        }
        if let Err(e) = state.resolver.delete(&session.session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }

    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (
        jar.remove(clear_cookie),
        Redirect::to(state.settings.rules.login_path()),
    )
}

// ── Helpers ────────────────────────────────────────────────────────

fn parse_provider(slug: &str, login_path: &str) -> Result<OAuthProvider, AuthError> {
    slug.parse()
        .map_err(|_| AuthError::sign_in(login_path, "unsupported_provider"))
}

/// Provider-reported errors pass through; everything else is a state problem.
fn callback_error_code(params: &CallbackParams) -> String {
    match (&params.error, &params.code) {
        (Some(error), _) => error.clone(),
        (None, None) => "missing_code".into(),
        (None, Some(_)) => "state_mismatch".into(),
    }
}

/// The API's current organization if it is a membership, else the first membership.
fn pick_organization(me: &CurrentUser) -> (Option<OrganizationId>, Option<Role>) {
    let chosen = me
        .current_organization_id
        .as_ref()
        .and_then(|id| me.memberships.iter().find(|m| &m.organization.id == id))
        .or_else(|| me.memberships.first());
    match chosen {
        Some(m) => (Some(m.organization.id.clone()), Some(m.role)),
        None => (None, None),
    }
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}
