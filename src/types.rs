use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Server-assigned user identifier (opaque string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Tenant identifier. All client state is scoped to exactly one of these at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

/// Billing plan identifier (`"free"`, `"pro"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct PlanId(pub String);

/// Feature key attached to a billing plan.
///
/// Presence of a key in the organization's [`FeatureSet`](crate::features::FeatureSet)
/// is the only gate for privileged capabilities.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct FeatureKey(pub String);

impl From<&str> for FeatureKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<&str> for PlanId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Validated locale tag: two lowercase letters, optionally `-` and a two-letter region.
///
/// Guaranteed well-formed by construction. The region is normalized to uppercase,
/// so `"pt-br"` parses as `pt-BR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language part without the region (`"pt"` for `pt-BR`).
    #[must_use]
    pub fn language(&self) -> &str {
        &self.0[..2]
    }

    /// Whether the language belongs to [`SUPPORTED_LOCALES`](crate::locale::SUPPORTED_LOCALES).
    #[must_use]
    pub fn is_supported(&self) -> bool {
        crate::locale::SUPPORTED_LOCALES.contains(&self.language())
    }

    /// Syntactic check only, no allocation.
    pub(crate) fn is_well_formed(s: &str) -> bool {
        let b = s.as_bytes();
        match b.len() {
            2 => b.iter().all(u8::is_ascii_lowercase),
            5 => {
                b[..2].iter().all(u8::is_ascii_lowercase)
                    && b[2] == b'-'
                    && b[3..].iter().all(u8::is_ascii_alphabetic)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for Locale {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if !Self::is_well_formed(&s) {
            return Err(Error::InvalidLocale(s));
        }
        if s.len() == 5 {
            let region = s[3..].to_ascii_uppercase();
            Ok(Self(format!("{}-{region}", &s[..2])))
        } else {
            Ok(Self(s))
        }
    }
}

impl From<Locale> for String {
    fn from(l: Locale) -> Self {
        l.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(crate::locale::DEFAULT_LOCALE.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_locales() {
        assert!("en".parse::<Locale>().is_ok());
        assert!("pt-BR".parse::<Locale>().is_ok());
        assert_eq!("pt-br".parse::<Locale>().unwrap().as_str(), "pt-BR");
    }

    #[test]
    fn invalid_locales() {
        assert!("EN".parse::<Locale>().is_err());
        assert!("eng".parse::<Locale>().is_err());
        assert!("en_US".parse::<Locale>().is_err());
        assert!("en-USA".parse::<Locale>().is_err());
        assert!("".parse::<Locale>().is_err());
        assert!("admin".parse::<Locale>().is_err());
    }

    #[test]
    fn language_and_support() {
        let l: Locale = "es-MX".parse().unwrap();
        assert_eq!(l.language(), "es");
        assert!(l.is_supported());
        assert!(!"fr".parse::<Locale>().unwrap().is_supported());
    }

    #[test]
    fn locale_serde_rejects_malformed() {
        let parsed: Locale = serde_json::from_str("\"pt\"").unwrap();
        assert_eq!(parsed.as_str(), "pt");
        assert!(serde_json::from_str::<Locale>("\"portuguese\"").is_err());
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_org(_: &OrganizationId) {}
        fn takes_user(_: &UserId) {}

        let org = OrganizationId::from("org-1");
        let user = UserId::from("usr-1".to_string());

        takes_org(&org);
        takes_user(&user);
        assert_eq!(org.to_string(), "org-1");
    }
}
