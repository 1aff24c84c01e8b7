#![cfg(feature = "axum")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{EXPIRED_PASSWORD, GOOD_PASSWORD, GOOD_TOKEN, MockApi, MockState};
use tenant_session::preferences::{LOCALE_KEY, ORGANIZATION_KEY};
use tenant_session::{
    ApiErrorCode, AuthTokens, CallbackParams, Error, FeatureGate, FeatureKey, GuardDecision, Locale,
    LoginOutcome, MemoryPreferences, OAuthProvider, OrganizationId, PendingOAuth, Permissions,
    PreferenceStore, Role, UpgradeAction,
};

fn tokens() -> Option<AuthTokens> {
    Some(AuthTokens::new(GOOD_TOKEN))
}

fn has(manager: &tenant_session::SessionManager, feature: &str) -> bool {
    manager.store().features().contains(&FeatureKey::from(feature))
}

// ── Bootstrap ──────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_bootstrap_issues_one_request() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let (a, b, c) = tokio::join!(
        manager.bootstrap(tokens()),
        manager.bootstrap(tokens()),
        manager.bootstrap(tokens()),
    );

    assert!(a && b && c);
    assert_eq!(MockState::count(&api.state.me_calls), 1);

    let snapshot = manager.snapshot();
    assert!(snapshot.session.is_authenticated());
    assert!(!snapshot.session.loading());
    assert_eq!(
        snapshot.organization.current_id(),
        Some(&OrganizationId::from("org-1"))
    );
    assert_eq!(snapshot.organization.role(), Some(Role::Owner));
    assert!(has(&manager, "reports"));
}

#[tokio::test]
async fn failed_bootstrap_is_signed_out() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let authenticated = manager.bootstrap(Some(AuthTokens::new("stale"))).await;

    assert!(!authenticated);
    assert!(!manager.store().is_authenticated());
    assert!(!manager.snapshot().session.loading());
    assert_eq!(manager.permissions(), Permissions::NONE);
    assert!(matches!(
        manager.route("/en/admin/settings"),
        GuardDecision::RedirectToLogin(_)
    ));
}

#[tokio::test]
async fn bootstrap_without_tokens_skips_the_api() {
    let api = MockApi::start().await;
    let manager = api.manager();

    assert!(!manager.bootstrap(None).await);
    assert_eq!(MockState::count(&api.state.me_calls), 0);
    assert!(!manager.snapshot().session.loading());
}

#[tokio::test]
async fn persisted_organization_wins_when_still_a_member() {
    let api = MockApi::start().await;
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(ORGANIZATION_KEY, "org-2").unwrap();
    let manager = api.manager().with_preferences(prefs);

    assert!(manager.bootstrap(tokens()).await);

    assert_eq!(
        manager.store().current_organization_id(),
        Some(OrganizationId::from("org-2"))
    );
    assert_eq!(manager.permissions(), Permissions::for_role(Some(Role::Member)));
}

#[tokio::test]
async fn stale_persisted_organization_falls_back_to_api_choice() {
    let api = MockApi::start().await;
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set(ORGANIZATION_KEY, "org-gone").unwrap();
    let manager = api.manager().with_preferences(prefs.clone());

    assert!(manager.bootstrap(tokens()).await);

    assert_eq!(
        manager.store().current_organization_id(),
        Some(OrganizationId::from("org-1"))
    );
    assert_eq!(prefs.get(ORGANIZATION_KEY).as_deref(), Some("org-1"));
}

#[tokio::test]
async fn cancelled_bootstrap_ends_loading() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(10), manager.bootstrap(tokens())).await;
    assert!(cancelled.is_err());

    assert!(!manager.snapshot().session.loading());
    assert!(matches!(
        manager.route("/admin"),
        GuardDecision::RedirectToLogin(_)
    ));
}

#[tokio::test]
async fn bootstrap_after_cancellation_runs_again() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let _ = tokio::time::timeout(Duration::from_millis(10), manager.bootstrap(tokens())).await;
    assert!(manager.bootstrap(tokens()).await);

    assert!(manager.store().is_authenticated());
    assert!(!manager.snapshot().session.loading());
}

// ── Login ──────────────────────────────────────────────────────────

#[tokio::test]
async fn login_populates_session() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let outcome = manager.login("ana@example.com", GOOD_PASSWORD).await.unwrap();

    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert!(manager.permissions().can_manage_billing);
    assert_eq!(
        manager.route("/auth/login"),
        GuardDecision::RedirectAuthenticated("/admin".into())
    );
}

#[tokio::test]
async fn password_change_is_a_typed_outcome() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let outcome = manager.login("ana@example.com", EXPIRED_PASSWORD).await.unwrap();

    assert_eq!(outcome, LoginOutcome::PasswordChangeRequired);
    assert!(!manager.store().is_authenticated());
    assert!(!manager.snapshot().session.loading());
}

#[tokio::test]
async fn rejected_credentials_carry_code_and_message() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let err = manager.login("ana@example.com", "nope").await.unwrap_err();

    assert_eq!(err.api_code(), Some(&ApiErrorCode::InvalidCredentials));
    assert_eq!(err.user_message(), "Wrong email or password");
    assert!(!manager.store().is_authenticated());
}

#[tokio::test]
async fn cancelled_login_ends_loading() {
    let api = MockApi::start().await;
    let manager = api.manager();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(10),
        manager.login("ana@example.com", GOOD_PASSWORD),
    )
    .await;
    assert!(cancelled.is_err());

    assert!(!manager.snapshot().session.loading());
}

// ── OAuth ──────────────────────────────────────────────────────────

#[tokio::test]
async fn oauth_callback_signs_in() {
    let api = MockApi::start().await;
    let manager = api.manager();
    let pending = PendingOAuth {
        state: "s-123".into(),
        code_verifier: "verifier".into(),
        redirect_uri: "http://localhost/auth/callback".into(),
    };
    let params = CallbackParams {
        code: Some("provider-code".into()),
        state: Some("s-123".into()),
        ..CallbackParams::default()
    };

    manager
        .complete_oauth(OAuthProvider::Google, &params, &pending)
        .await
        .unwrap();

    assert!(manager.store().is_authenticated());
}

#[tokio::test]
async fn oauth_state_mismatch_never_reaches_the_api() {
    let api = MockApi::start().await;
    let manager = api.manager();
    let pending = PendingOAuth {
        state: "expected".into(),
        code_verifier: "verifier".into(),
        redirect_uri: "http://localhost/auth/callback".into(),
    };
    let params = CallbackParams {
        code: Some("provider-code".into()),
        state: Some("forged".into()),
        ..CallbackParams::default()
    };

    let err = manager
        .complete_oauth(OAuthProvider::Google, &params, &pending)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OAuth { .. }));
    assert_eq!(MockState::count(&api.state.me_calls), 0);
    assert!(!manager.store().is_authenticated());
}

#[tokio::test]
async fn forged_oauth_callback_signs_out_existing_session() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);
    let pending = PendingOAuth {
        state: "expected".into(),
        code_verifier: "verifier".into(),
        redirect_uri: "http://localhost/auth/callback".into(),
    };
    let params = CallbackParams {
        error: Some("access_denied".into()),
        ..CallbackParams::default()
    };

    let err = manager
        .complete_oauth(OAuthProvider::Google, &params, &pending)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OAuth { .. }));
    assert!(!manager.store().is_authenticated());
    assert!(!manager.snapshot().session.loading());
}

// ── Invalidation ───────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_response_clears_session() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);

    MockState::set(&api.state.reject_tokens, true);
    let err = manager.load_members().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!manager.store().is_authenticated());
    assert_eq!(manager.permissions(), Permissions::NONE);
}

#[tokio::test]
async fn logout_clears_session_even_if_api_fails() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);
    assert!(manager.permissions().can_delete_organization);

    MockState::set(&api.state.fail_logout, true);
    manager.logout().await;

    assert_eq!(MockState::count(&api.state.logout_calls), 1);
    assert_eq!(manager.permissions(), Permissions::NONE);
    assert!(manager.store().features().is_empty());
    assert!(manager.preferences().get(ORGANIZATION_KEY).is_none());
}

// ── Organizations ──────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_member_loads_share_one_request() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);

    let (a, b) = tokio::join!(manager.load_members(), manager.load_members());

    assert_eq!(a.unwrap().len(), 2);
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(MockState::count(&api.state.members_calls), 1);
    assert_eq!(manager.snapshot().organization.members().len(), 2);
}

#[tokio::test]
async fn switching_organization_drops_dependent_state() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);
    manager.load_members().await.unwrap();

    manager
        .switch_organization(&OrganizationId::from("org-2"))
        .await
        .unwrap();

    let snapshot = manager.snapshot();
    assert!(snapshot.organization.members().is_empty());
    assert_eq!(snapshot.organization.role(), Some(Role::Member));
    assert!(has(&manager, "pipeline"));
    assert!(!has(&manager, "reports"));
    assert!(!manager.permissions().can_manage_billing);
    assert_eq!(
        manager.preferences().get(ORGANIZATION_KEY).as_deref(),
        Some("org-2")
    );
}

#[tokio::test]
async fn switching_to_foreign_organization_fails() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);

    let err = manager
        .switch_organization(&OrganizationId::from("org-9"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownOrganization(ref id) if id == "org-9"));
    assert_eq!(
        manager.store().current_organization_id(),
        Some(OrganizationId::from("org-1"))
    );
}

// ── Preferences ────────────────────────────────────────────────────

#[tokio::test]
async fn preferences_load_from_api() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);

    let prefs = manager.load_preferences().await;

    assert_eq!(prefs.locale.as_str(), "es");
    assert!(prefs.email_notifications);
}

#[tokio::test]
async fn preferences_fall_back_to_defaults() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);
    manager.set_locale(&"pt".parse().unwrap()).unwrap();

    MockState::set(&api.state.fail_preferences, true);
    let prefs = manager.load_preferences().await;

    assert_eq!(prefs.locale.as_str(), "pt");
    assert_eq!(prefs.timezone, None);
    assert!(manager.store().is_authenticated());
}

#[tokio::test]
async fn saved_preferences_persist_locale() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);

    let mut prefs = manager.load_preferences().await;
    prefs.locale = "pt-BR".parse().unwrap();
    manager.save_preferences(&prefs).await.unwrap();

    assert_eq!(manager.preferences().get(LOCALE_KEY).as_deref(), Some("pt-BR"));
    assert_eq!(manager.locale(), "pt-BR".parse::<Locale>().unwrap());
}

// ── Feature gate ───────────────────────────────────────────────────

#[tokio::test]
async fn failed_upgrade_is_swallowed() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);
    MockState::set(&api.state.fail_upgrade, true);

    let gate = FeatureGate::<()>::new("advanced").with_upgrade_action(UpgradeAction::RequestUpgrade {
        plan: "pro".into(),
    });

    assert_eq!(gate.upgrade(&manager).await, None);
    assert_eq!(MockState::count(&api.state.upgrade_calls), 1);
    assert!(!has(&manager, "advanced"));
    assert!(manager.store().is_authenticated());
}

#[tokio::test]
async fn successful_upgrade_unlocks_feature() {
    let api = MockApi::start().await;
    let manager = api.manager();
    assert!(manager.bootstrap(tokens()).await);

    let gate = FeatureGate::<()>::new("advanced").with_upgrade_action(UpgradeAction::RequestUpgrade {
        plan: "pro".into(),
    });
    gate.upgrade(&manager).await;

    assert!(has(&manager, "advanced"));
}

#[tokio::test]
async fn billing_navigation_is_localized() {
    let api = MockApi::start().await;
    let manager = api.manager();
    manager.set_locale(&"pt".parse().unwrap()).unwrap();

    let gate = FeatureGate::<()>::new("advanced");

    assert_eq!(
        gate.upgrade(&manager).await.as_deref(),
        Some("/pt/admin/billing")
    );
}
