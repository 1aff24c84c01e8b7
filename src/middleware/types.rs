use crate::features::FeatureSet;
use crate::models::{AuthTokens, User};
use crate::permissions::Role;
use crate::types::OrganizationId;

/// Session data from a successful sign-in, passed to
/// [`SessionResolver::create`](super::SessionResolver::create) for the consumer to persist.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user: User,
    /// API tokens. Kept server-side, never sent to the browser.
    pub tokens: AuthTokens,
    pub organization_id: Option<OrganizationId>,
    pub role: Option<Role>,
    pub features: FeatureSet,
    /// Client `User-Agent` header value.
    pub user_agent: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
}

/// A live session as returned by [`SessionResolver::find`](super::SessionResolver::find).
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session_id: String,
    pub user: User,
    pub tokens: AuthTokens,
    pub organization_id: Option<OrganizationId>,
    pub role: Option<Role>,
    pub features: FeatureSet,
}

impl ResolvedSession {
    #[must_use]
    pub fn from_new(session_id: impl Into<String>, session: NewSession) -> Self {
        Self {
            session_id: session_id.into(),
            user: session.user,
            tokens: session.tokens,
            organization_id: session.organization_id,
            role: session.role,
            features: session.features,
        }
    }
}
