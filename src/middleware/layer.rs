use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::config::GuardConfig;
use super::state::GuardState;
use super::traits::SessionResolver;
use super::types::ResolvedSession;
use crate::api::ApiClient;
use crate::guard::{GuardDecision, GuardInput};

/// Wrap `router` in the route guard.
///
/// Each request's session cookie is resolved through `resolver`, the guard
/// decision table is applied to the request path, and handlers run with the
/// [`ResolvedSession`] in request extensions (see
/// [`CurrentSession`](super::CurrentSession)).
pub fn protect<S: SessionResolver>(
    router: Router,
    config: &GuardConfig,
    api: ApiClient,
    resolver: Arc<S>,
) -> Router {
    let state = GuardState {
        api: Arc::new(api),
        resolver,
        settings: Arc::new(config.settings.clone()),
    };
    router.layer(from_fn_with_state(state, route_guard::<S>))
}

/// Resolve the session cookie. Store failures count as signed out.
pub(super) async fn resolve_session<S: SessionResolver>(
    state: &GuardState<S>,
    jar: &PrivateCookieJar,
) -> Option<ResolvedSession> {
    let session_id = jar
        .get(&state.settings.session_cookie_name)
        .map(|c| c.value().to_string())?;

    match state.resolver.find(&session_id).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed, treating request as signed out");
            None
        }
    }
}

async fn route_guard<S: SessionResolver>(
    State(state): State<GuardState<S>>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = resolve_session(&state, &jar).await;
    let path = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

    let input = GuardInput {
        loading: false,
        is_authenticated: session.is_some(),
    };

    match state.settings.rules.decide(input, &path) {
        GuardDecision::RedirectToLogin(url) => {
            tracing::debug!(path = %path, "Unauthenticated request to protected route");
            Redirect::to(&url).into_response()
        }
        GuardDecision::RedirectAuthenticated(url) => Redirect::to(&url).into_response(),
        GuardDecision::Loading | GuardDecision::Render => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
    }
}
