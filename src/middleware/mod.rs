//! Server-side route guard and OAuth sign-in routes for Axum.
//!
//! The browser only ever holds an encrypted session cookie; API tokens stay
//! in the consumer's [`SessionResolver`]. The same [`RouteRules`](crate::guard::RouteRules)
//! decision table used by [`SessionManager`](crate::manager::SessionManager)
//! decides redirects here.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenant_session::middleware::{GuardConfig, MemorySessionResolver, auth_routes, protect};
//!
//! let config = GuardConfig::from_env()?.with_provider(google);
//! let api = ApiClient::new(&ClientConfig::from_env()?)?;
//! let resolver = Arc::new(MemorySessionResolver::new());
//!
//! let app = protect(
//!     axum::Router::new()
//!         .route("/admin", get(dashboard))
//!         .merge(auth_routes(&config, api.clone(), resolver.clone())),
//!     &config,
//!     api,
//!     resolver,
//! );
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod layer;
mod memory;
mod routes;
mod state;
mod traits;
mod types;

pub use config::GuardConfig;
pub use error::AuthError;
pub use extractor::CurrentSession;
pub use layer::protect;
pub use memory::MemorySessionResolver;
pub use routes::auth_routes;
pub use traits::{SessionResolver, StoreError};
pub use types::{NewSession, ResolvedSession};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
