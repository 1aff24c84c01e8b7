use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AuthError;
use super::types::ResolvedSession;
use crate::features::{FeatureGate, GateOutcome};
use crate::permissions::Permissions;

/// Session of the signed-in user, placed in request extensions by the route guard.
///
/// Use as an Axum extractor in handlers behind the guard. Rejects with
/// `401 Unauthorized` when there is no session.
///
/// # Example
///
/// ```rust,ignore
/// async fn billing(session: CurrentSession) -> impl IntoResponse {
///     if !session.permissions().can_manage_billing {
///         return StatusCode::FORBIDDEN.into_response();
///     }
///     format!("Billing for {}", session.user.email).into_response()
/// }
///
/// // Optional: accessible to both signed-in and anonymous visitors
/// async fn pricing(session: Option<CurrentSession>) -> impl IntoResponse { /* ... */ }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub ResolvedSession);

impl CurrentSession {
    #[must_use]
    pub fn permissions(&self) -> Permissions {
        Permissions::for_role(self.0.role)
    }

    #[must_use]
    pub fn gate<'a, F>(&self, gate: &'a FeatureGate<F>) -> GateOutcome<'a, F> {
        gate.evaluate(&self.0.features)
    }
}

impl std::ops::Deref for CurrentSession {
    type Target = ResolvedSession;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedSession>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::Unauthenticated)
    }
}

impl<S: Send + Sync> axum::extract::OptionalFromRequestParts<S> for CurrentSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<ResolvedSession>().cloned().map(Self))
    }
}
