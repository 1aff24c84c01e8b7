//! Route guard: decides, per request path, whether to render, wait or redirect.

use crate::locale::strip_locale;

/// Which list a path matched after its locale prefix was stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Protected,
    PublicAuth,
    Other,
}

/// Session fields the guard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardInput {
    pub loading: bool,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session is still loading: show a spinner, do not redirect.
    Loading,
    /// Unauthenticated on a protected route. Carries the full login URL.
    RedirectToLogin(String),
    /// Authenticated user on a public auth page.
    RedirectAuthenticated(String),
    Render,
}

/// Static prefix lists used for route classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRules {
    protected_prefixes: Vec<String>,
    public_prefixes: Vec<String>,
    login_path: String,
    home_path: String,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/admin".into()],
            public_prefixes: vec![
                "/auth/login".into(),
                "/auth/register".into(),
                "/auth/forgot-password".into(),
                "/auth/reset-password".into(),
            ],
            login_path: "/auth/login".into(),
            home_path: "/admin".into(),
        }
    }
}

impl RouteRules {
    #[must_use]
    pub fn with_protected_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.protected_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn with_public_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.public_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> RouteKind {
        let stripped = strip_locale(path);
        let path = stripped.split(['?', '#']).next().unwrap_or_default();

        if self.protected_prefixes.iter().any(|p| has_prefix(path, p)) {
            RouteKind::Protected
        } else if self.public_prefixes.iter().any(|p| has_prefix(path, p)) {
            RouteKind::PublicAuth
        } else {
            RouteKind::Other
        }
    }

    /// Apply the guard decision table to `path` (the original, locale-prefixed path).
    #[must_use]
    pub fn decide(&self, input: GuardInput, path: &str) -> GuardDecision {
        if input.loading {
            return GuardDecision::Loading;
        }
        match (input.is_authenticated, self.classify(path)) {
            (false, RouteKind::Protected) => GuardDecision::RedirectToLogin(self.login_url(path)),
            (true, RouteKind::PublicAuth) => {
                GuardDecision::RedirectAuthenticated(self.home_path.clone())
            }
            _ => GuardDecision::Render,
        }
    }

    /// `{login_path}?returnUrl=<path>`, with `path` percent-encoded.
    #[must_use]
    pub fn login_url(&self, return_to: &str) -> String {
        format!(
            "{}?returnUrl={}",
            self.login_path,
            urlencoding::encode(return_to)
        )
    }

    /// Where to go after login: `return_url` if it is a local path, home otherwise.
    #[must_use]
    pub fn sanitize_return_url(&self, return_url: Option<&str>) -> String {
        match return_url {
            Some(url) if is_local_path(url) => url.to_owned(),
            _ => self.home_path.clone(),
        }
    }
}

/// Segment-aware prefix match: `/admin` matches `/admin` and `/admin/x`, not `/administrator`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn is_local_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}
