use std::fmt;
#[cfg(feature = "client")]
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Fallback shown when an error carries nothing presentable.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Crate error. Cloneable so one failed request can be reported to every
/// caller that joined it.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[cfg(feature = "client")]
    #[error("HTTP error: {0}")]
    Http(#[source] Arc<reqwest::Error>),

    /// The API rejected the access token (HTTP 401).
    #[error("Not authenticated")]
    Unauthorized,

    /// Non-2xx response other than 401, decoded from the API error body.
    #[error("API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: ApiErrorCode,
        message: String,
    },

    #[error("OAuth error ({provider}): {detail}")]
    OAuth {
        provider: &'static str,
        detail: String,
    },

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Not a member of organization {0}")]
    UnknownOrganization(String),

    #[error("Preference storage error: {0}")]
    Preferences(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Human-readable message suitable for a toast or inline alert.
    ///
    /// Transport and internal failures collapse to [`GENERIC_ERROR_MESSAGE`];
    /// API errors surface the server's message when it sent one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".into(),
            Self::OAuth { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            Self::UnknownOrganization(_) => "You are not a member of that organization.".into(),
            _ => GENERIC_ERROR_MESSAGE.into(),
        }
    }

    /// Typed error code, when the API provided one.
    #[must_use]
    pub fn api_code(&self) -> Option<&ApiErrorCode> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Arc::new(e))
    }
}

/// Machine-readable error code returned in the API error body.
///
/// Callers branch on this instead of matching substrings of the message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[non_exhaustive]
pub enum ApiErrorCode {
    PasswordChangeRequired,
    InvalidCredentials,
    EmailNotVerified,
    PlanLimitReached,
    NotFound,
    Forbidden,
    Validation,
    Other(String),
}

impl ApiErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PasswordChangeRequired => "password_change_required",
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailNotVerified => "email_not_verified",
            Self::PlanLimitReached => "plan_limit_reached",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Validation => "validation_error",
            Self::Other(code) => code.as_str(),
        }
    }
}

impl From<String> for ApiErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "password_change_required" => Self::PasswordChangeRequired,
            "invalid_credentials" => Self::InvalidCredentials,
            "email_not_verified" => Self::EmailNotVerified,
            "plan_limit_reached" => Self::PlanLimitReached,
            "not_found" => Self::NotFound,
            "forbidden" => Self::Forbidden,
            "validation_error" => Self::Validation,
            _ => Self::Other(code),
        }
    }
}

impl From<ApiErrorCode> for String {
    fn from(code: ApiErrorCode) -> Self {
        match code {
            ApiErrorCode::Other(code) => code,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
