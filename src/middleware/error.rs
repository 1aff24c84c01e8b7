use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

/// Errors of the server-side guard and auth routes.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No valid session found.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Sign-in flow failed. The browser is sent back to `login_path` with
    /// `?error=<code>`.
    #[error("Sign-in failed: {code}")]
    SignIn { login_path: String, code: String },

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    pub(super) fn sign_in(login_path: &str, code: impl Into<String>) -> Self {
        Self::SignIn {
            login_path: login_path.to_owned(),
            code: code.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            Self::SignIn { login_path, code } => {
                let encoded = urlencoding::encode(&code);
                Redirect::to(&format!("{login_path}?error={encoded}")).into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "Auth configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
