//! Third-party identity provider sign-in.
//!
//! The browser is sent to the provider's authorize endpoint with a random
//! `state` and a PKCE challenge. The provider redirects back with `code`,
//! `state` or `error`; after [`CallbackParams::verify`] the code is handed to
//! the API, which performs the token exchange.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Microsoft,
}

impl OAuthProvider {
    /// Path segment used in callback URLs and API endpoints.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
        }
    }

    fn default_authorize_url(self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Self::Microsoft => "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "microsoft" => Ok(Self::Microsoft),
            other => Err(Error::OAuth {
                provider: "unknown",
                detail: format!("unsupported provider: {other}"),
            }),
        }
    }
}

/// Provider registration.
///
/// Required fields are constructor parameters; the rest have defaults.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) provider: OAuthProvider,
    pub(crate) client_id: String,
    pub(crate) authorize_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provider's built-in authorize URL fails to parse.
    pub fn new(
        provider: OAuthProvider,
        client_id: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        let authorize_url = provider
            .default_authorize_url()
            .parse()
            .map_err(|e| Error::Config(format!("{provider} authorize URL: {e}")))?;
        Ok(Self {
            provider,
            client_id: client_id.into(),
            authorize_url,
            redirect_uri,
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        })
    }

    #[must_use]
    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    /// Override the scopes (default: `openid email profile`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn provider(&self) -> OAuthProvider {
        self.provider
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Build the provider redirect. Keep `state` and `code_verifier` until the callback.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = generate_state();
        let code_verifier = generate_code_verifier();
        let challenge = code_challenge(&code_verifier);

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        AuthorizationRequest {
            url: url.into(),
            state,
            code_verifier,
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Query parameters of the provider's redirect back to us.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Check the callback against the `state` issued with the authorize redirect.
    ///
    /// Returns the authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OAuth`] if the provider reported an error, or if the
    /// code is missing, or if the state is missing or differs from `expected_state`.
    pub fn verify(&self, provider: OAuthProvider, expected_state: Option<&str>) -> Result<&str, Error> {
        let fail = |detail: &str| Error::OAuth {
            provider: provider.slug(),
            detail: detail.to_owned(),
        };

        if let Some(error) = &self.error {
            let detail = self.error_description.as_deref().unwrap_or(error);
            return Err(fail(detail));
        }

        let code = self
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| fail("missing_code"))?;

        match (self.state.as_deref(), expected_state) {
            (Some(received), Some(expected)) if received == expected => Ok(code),
            _ => Err(fail("state_mismatch")),
        }
    }
}

/// 64-character URL-safe PKCE verifier (48 random bytes).
#[must_use]
pub fn generate_code_verifier() -> String {
    let bytes: [u8; 48] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge: `BASE64URL(SHA256(verifier))`.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// 22-character URL-safe `state` value (16 random bytes).
#[must_use]
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
