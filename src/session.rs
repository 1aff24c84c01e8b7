//! Client-side session and organization store.
//!
//! One [`SessionStore`] holds the authenticated user, their tokens and the
//! current organization context. Every setter publishes a fresh [`Snapshot`]
//! to subscribers. Writers from different tasks are not coordinated: the last
//! write wins.

use tokio::sync::watch;

use crate::features::FeatureSet;
use crate::guard::GuardInput;
use crate::models::{AuthTokens, Member, Membership, Organization, User};
use crate::permissions::{Permissions, Role};
use crate::types::OrganizationId;

/// Authentication part of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    tokens: Option<AuthTokens>,
    loading: bool,
}

impl Session {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> Option<&AuthTokens> {
        self.tokens.as_ref()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    /// Derived from the presence of a user, so it can never be true without one.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.tokens.is_some()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }
}

/// Organization part of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationContext {
    memberships: Vec<Membership>,
    current: Option<OrganizationId>,
    members: Vec<Member>,
    features: FeatureSet,
}

impl OrganizationContext {
    #[must_use]
    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }

    #[must_use]
    pub fn current_id(&self) -> Option<&OrganizationId> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Membership> {
        let id = self.current.as_ref()?;
        self.membership(id)
    }

    #[must_use]
    pub fn current_organization(&self) -> Option<&Organization> {
        self.current().map(|m| &m.organization)
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.current().map(|m| m.role)
    }

    #[must_use]
    pub fn membership(&self, id: &OrganizationId) -> Option<&Membership> {
        self.memberships.iter().find(|m| &m.organization.id == id)
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }
}

/// Everything a subscriber sees after each store change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub session: Session,
    pub organization: OrganizationContext,
}

impl Snapshot {
    #[must_use]
    pub fn permissions(&self) -> Permissions {
        Permissions::for_role(self.organization.role())
    }

    #[must_use]
    pub fn guard_input(&self) -> GuardInput {
        GuardInput {
            loading: self.session.loading,
            is_authenticated: self.session.is_authenticated(),
        }
    }
}

/// Observable store for [`Snapshot`].
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Snapshot>,
}

/// Clears the loading flag on drop. See [`SessionStore::begin_loading`].
pub struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    /// Receiver notified after every setter call.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().session.is_authenticated()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().session.access_token().map(str::to_owned)
    }

    #[must_use]
    pub fn current_organization_id(&self) -> Option<OrganizationId> {
        self.tx.borrow().organization.current.clone()
    }

    #[must_use]
    pub fn permissions(&self) -> Permissions {
        self.tx.borrow().permissions()
    }

    #[must_use]
    pub fn guard_input(&self) -> GuardInput {
        self.tx.borrow().guard_input()
    }

    #[must_use]
    pub fn features(&self) -> FeatureSet {
        self.tx.borrow().organization.features.clone()
    }

    // ── Session setters ────────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|s| s.session.loading = loading);
    }

    /// Set loading until the returned guard drops, including when the
    /// surrounding future is cancelled.
    #[must_use = "loading ends as soon as the guard is dropped"]
    pub fn begin_loading(&self) -> LoadingGuard<'_> {
        self.set_loading(true);
        LoadingGuard { store: self }
    }

    pub fn set_authenticated(&self, user: User, tokens: AuthTokens) {
        self.tx.send_modify(|s| {
            s.session.user = Some(user);
            s.session.tokens = Some(tokens);
        });
    }

    /// Replace tokens after a refresh. Ignored when nobody is signed in.
    pub fn set_tokens(&self, tokens: AuthTokens) {
        self.tx.send_if_modified(|s| {
            if s.session.user.is_none() {
                return false;
            }
            s.session.tokens = Some(tokens);
            true
        });
    }

    pub fn set_user(&self, user: User) {
        self.tx.send_modify(|s| s.session.user = Some(user));
    }

    /// Drop the whole session and organization context (logout, 401).
    ///
    /// The loading flag is kept so an in-progress bootstrap can still finish it.
    pub fn clear(&self) {
        self.tx.send_modify(|s| {
            let loading = s.session.loading;
            *s = Snapshot::default();
            s.session.loading = loading;
        });
    }

    // ── Organization setters ───────────────────────────────────────

    /// Replace the memberships list. A current organization the user no longer
    /// belongs to is deselected along with its members and features.
    pub fn set_memberships(&self, memberships: Vec<Membership>) {
        self.tx.send_modify(|s| {
            let org = &mut s.organization;
            org.memberships = memberships;
            let still_member = org
                .current
                .as_ref()
                .is_some_and(|id| org.memberships.iter().any(|m| &m.organization.id == id));
            if !still_member {
                org.current = None;
                org.members.clear();
                org.features = FeatureSet::default();
            }
        });
    }

    /// Switch the current organization. Dependent members and features are cleared.
    ///
    /// Returns `false` (and changes nothing) if `id` is not one of the memberships.
    pub fn select_organization(&self, id: &OrganizationId) -> bool {
        self.tx.send_if_modified(|s| {
            let org = &mut s.organization;
            if !org.memberships.iter().any(|m| &m.organization.id == id) {
                return false;
            }
            org.current = Some(id.clone());
            org.members.clear();
            org.features = FeatureSet::default();
            true
        })
    }

    /// Store members for `id`. Dropped if `id` is no longer the current organization.
    pub fn set_members(&self, id: &OrganizationId, members: Vec<Member>) {
        self.tx.send_if_modified(|s| {
            if s.organization.current.as_ref() != Some(id) {
                return false;
            }
            s.organization.members = members;
            true
        });
    }

    /// Store the feature set for `id`. Dropped if `id` is no longer the current organization.
    pub fn set_features(&self, id: &OrganizationId, features: FeatureSet) {
        self.tx.send_if_modified(|s| {
            if s.organization.current.as_ref() != Some(id) {
                return false;
            }
            s.organization.features = features;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(id: &str, role: Role) -> Membership {
        Membership {
            organization: Organization::new(id, format!("Org {id}")),
            role,
        }
    }

    fn signed_in() -> SessionStore {
        let store = SessionStore::new();
        store.set_authenticated(User::new("u1", "ana@example.com"), AuthTokens::new("t1"));
        store.set_memberships(vec![
            membership("org-a", Role::Owner),
            membership("org-b", Role::Member),
        ]);
        assert!(store.select_organization(&"org-a".into()));
        store
    }

    #[test]
    fn starts_empty() {
        let store = SessionStore::new();
        let snap = store.snapshot();
        assert!(!snap.session.is_authenticated());
        assert!(!snap.session.loading());
        assert_eq!(snap.permissions(), Permissions::NONE);
    }

    #[test]
    fn authenticated_implies_user() {
        let store = signed_in();
        let snap = store.snapshot();
        assert!(snap.session.is_authenticated());
        assert!(snap.session.user().is_some());
        assert_eq!(store.access_token().as_deref(), Some("t1"));
    }

    #[test]
    fn tokens_without_user_are_ignored() {
        let store = SessionStore::new();
        store.set_tokens(AuthTokens::new("orphan"));
        assert!(store.access_token().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn permissions_follow_current_role() {
        let store = signed_in();
        assert!(store.permissions().can_manage_billing);

        assert!(store.select_organization(&"org-b".into()));
        assert_eq!(store.permissions(), Permissions::NONE);
    }

    #[test]
    fn switching_clears_dependents() {
        let store = signed_in();
        let org_a: OrganizationId = "org-a".into();
        store.set_features(&org_a, ["pipeline"].into_iter().collect());
        store.set_members(
            &org_a,
            vec![Member {
                user_id: "u1".into(),
                email: "ana@example.com".into(),
                name: None,
                role: Role::Owner,
            }],
        );
        assert_eq!(store.snapshot().organization.members().len(), 1);

        assert!(store.select_organization(&"org-b".into()));
        let snap = store.snapshot();
        assert!(snap.organization.members().is_empty());
        assert!(snap.organization.features().is_empty());
    }

    #[test]
    fn unknown_organization_is_rejected() {
        let store = signed_in();
        assert!(!store.select_organization(&"org-z".into()));
        assert_eq!(store.current_organization_id(), Some("org-a".into()));
    }

    #[test]
    fn stale_results_are_dropped() {
        let store = signed_in();
        store.select_organization(&"org-b".into());
        store.set_features(&"org-a".into(), ["pipeline"].into_iter().collect());
        assert!(store.features().is_empty());
    }

    #[test]
    fn clear_resets_permissions() {
        let store = signed_in();
        store.clear();
        let snap = store.snapshot();
        assert!(!snap.session.is_authenticated());
        assert!(snap.organization.memberships().is_empty());
        assert_eq!(store.permissions(), Permissions::NONE);
    }

    #[test]
    fn lost_membership_deselects() {
        let store = signed_in();
        store.set_memberships(vec![membership("org-b", Role::Admin)]);
        assert!(store.current_organization_id().is_none());
        assert_eq!(store.permissions(), Permissions::NONE);
    }

    #[test]
    fn loading_guard_ends_loading_on_drop() {
        let store = SessionStore::new();
        let guard = store.begin_loading();
        assert!(store.snapshot().session.loading());
        assert!(store.guard_input().loading);

        drop(guard);
        assert!(!store.snapshot().session.loading());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        store.set_loading(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().session.loading());

        store.set_authenticated(User::new("u1", "a@b.c"), AuthTokens::new("t"));
        rx.changed().await.unwrap();
        assert!(rx.borrow().guard_input().is_authenticated);
    }
}
