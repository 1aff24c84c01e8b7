use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::GuardSettings;
use super::traits::SessionResolver;
use crate::api::ApiClient;

/// Shared state for the guard middleware and auth route handlers.
pub(super) struct GuardState<S> {
    pub(super) api: Arc<ApiClient>,
    pub(super) resolver: Arc<S>,
    pub(super) settings: Arc<GuardSettings>,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for GuardState<S> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            resolver: self.resolver.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S: SessionResolver> FromRef<GuardState<S>> for Key {
    fn from_ref(state: &GuardState<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
