//! In-process `/api/v1` server for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use tenant_session::{ClientConfig, SessionManager};
use tokio::net::TcpListener;
use url::Url;

pub const GOOD_TOKEN: &str = "good-token";
pub const GOOD_PASSWORD: &str = "correct horse";
pub const EXPIRED_PASSWORD: &str = "expired";

/// Slow enough that concurrent callers overlap.
const LATENCY: Duration = Duration::from_millis(50);

#[derive(Default)]
pub struct MockState {
    pub me_calls: AtomicUsize,
    pub members_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub upgrade_calls: AtomicUsize,
    /// Every bearer token is rejected with 401.
    pub reject_tokens: AtomicBool,
    pub fail_logout: AtomicBool,
    pub fail_preferences: AtomicBool,
    pub fail_upgrade: AtomicBool,
}

impl MockState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

pub struct MockApi {
    pub base_url: Url,
    pub state: Arc<MockState>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}").parse().unwrap(),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }

    pub fn manager(&self) -> SessionManager {
        SessionManager::new(&self.config()).unwrap()
    }
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/oauth/{provider}/callback", post(oauth_callback))
        .route("/api/v1/users/me/preferences", get(get_preferences).put(put_preferences))
        .route("/api/v1/organizations/{id}/members", get(members))
        .route("/api/v1/subscriptions/{id}", get(subscription))
        .route("/api/v1/subscriptions/{id}/upgrade", post(upgrade))
        .with_state(state)
}

fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {GOOD_TOKEN}");
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if state.reject_tokens.load(Ordering::SeqCst) || presented != Some(expected.as_str()) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"code": "unauthorized"}))).into_response());
    }
    Ok(())
}

fn auth_response() -> Value {
    json!({
        "user": {"id": "u1", "email": "ana@example.com", "name": "Ana"},
        "tokens": {"access_token": GOOD_TOKEN, "refresh_token": "refresh", "expires_in": 3600}
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    match body["password"].as_str() {
        Some(GOOD_PASSWORD) => Json(auth_response()).into_response(),
        Some(EXPIRED_PASSWORD) => (
            StatusCode::FORBIDDEN,
            Json(json!({"code": "password_change_required", "message": "Your password has expired"})),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "invalid_credentials", "message": "Wrong email or password"})),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> StatusCode {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(LATENCY).await;
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!({
        "user": {"id": "u1", "email": "ana@example.com", "name": "Ana"},
        "memberships": [
            {"organization": {"id": "org-1", "name": "Acme"}, "role": "owner"},
            {"organization": {"id": "org-2", "name": "Globex"}, "role": "member"}
        ],
        "current_organization_id": "org-1"
    }))
    .into_response()
}

async fn oauth_callback(Path(provider): Path<String>, Json(body): Json<Value>) -> Response {
    if provider != "google" || body["code"] != "provider-code" || body["code_verifier"].is_null() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "invalid_grant", "message": "Bad code"})),
        )
            .into_response();
    }
    Json(auth_response()).into_response()
}

async fn get_preferences(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if state.fail_preferences.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({"locale": "es", "timezone": "Europe/Madrid", "email_notifications": true}))
        .into_response()
}

async fn put_preferences(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(body).into_response()
}

async fn members(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.members_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(LATENCY).await;
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!([
        {"user_id": "u1", "email": "ana@example.com", "role": "owner"},
        {"user_id": format!("{id}-u2"), "email": "bo@example.com", "role": "member"}
    ]))
    .into_response()
}

fn plan_features(id: &str) -> Value {
    match id {
        "org-1" => json!(["pipeline", "reports"]),
        _ => json!(["pipeline"]),
    }
}

async fn subscription(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!({"plan": "starter", "status": "active", "features": plan_features(&id)}))
        .into_response()
}

async fn upgrade(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.upgrade_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if state.fail_upgrade.load(Ordering::SeqCst) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"code": "plan_limit_reached", "message": "Contact sales"})),
        )
            .into_response();
    }
    let mut features = plan_features(&id);
    if let Some(list) = features.as_array_mut() {
        list.push(json!("advanced"));
    }
    Json(json!({"plan": body["plan"], "status": "active", "features": features})).into_response()
}
