#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod features;
pub mod guard;
pub mod inflight;
pub mod locale;
pub mod models;
pub mod oauth;
pub mod permissions;
pub mod preferences;
pub mod session;
pub mod types;

#[cfg(feature = "client")]
pub mod api;
#[cfg(feature = "client")]
pub mod manager;

#[cfg(feature = "axum")]
pub mod middleware;

// Re-exports for convenient access
pub use config::ClientConfig;
pub use error::{ApiErrorCode, Error};
pub use features::{FeatureGate, FeatureSet, GateOutcome, PromptStyle, UpgradeAction};
pub use guard::{GuardDecision, GuardInput, RouteKind, RouteRules};
pub use inflight::InFlight;
pub use locale::{DEFAULT_LOCALE, SUPPORTED_LOCALES, localize_path, strip_locale, switch_locale};
pub use models::{AuthTokens, CurrentUser, Member, Membership, Organization, Subscription, User, UserPreferences};
pub use oauth::{AuthorizationRequest, CallbackParams, OAuthConfig, OAuthProvider};
pub use permissions::{Permissions, Role};
pub use preferences::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use session::{OrganizationContext, Session, SessionStore, Snapshot};
pub use types::{FeatureKey, Locale, OrganizationId, PlanId, UserId};

#[cfg(feature = "client")]
pub use api::ApiClient;
#[cfg(feature = "client")]
pub use manager::{LoginOutcome, PendingOAuth, SessionManager};
