//! Plan-based feature gating.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{FeatureKey, PlanId};

/// Feature keys enabled by the organization's current plan. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(HashSet<FeatureKey>);

impl FeatureSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &FeatureKey) -> bool {
        self.0.contains(key)
    }

    pub fn insert(&mut self, key: impl Into<FeatureKey>) -> bool {
        self.0.insert(key.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureKey> {
        self.0.iter()
    }
}

impl<K: Into<FeatureKey>> FromIterator<K> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// How the generic upgrade prompt is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Inline card.
    #[default]
    Card,
    /// Compact banner.
    Banner,
}

/// What the upgrade prompt does when activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeAction {
    /// Send the user to the billing page (unlocalized path).
    NavigateToBilling { path: String },
    /// Ask the API to move the organization to `plan`.
    RequestUpgrade { plan: PlanId },
}

impl Default for UpgradeAction {
    fn default() -> Self {
        Self::NavigateToBilling {
            path: "/admin/billing".into(),
        }
    }
}

/// Result of evaluating a [`FeatureGate`]. Exactly one variant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome<'a, F> {
    Children,
    Fallback(&'a F),
    UpgradePrompt(PromptStyle),
    Nothing,
}

/// Gate privileged content behind a feature key.
///
/// `F` is whatever the caller renders as a fallback.
///
/// ```rust
/// use tenant_session::features::{FeatureGate, FeatureSet, GateOutcome};
///
/// let features: FeatureSet = ["pipeline"].into_iter().collect();
/// let gate = FeatureGate::<()>::new("pipeline");
/// assert_eq!(gate.evaluate(&features), GateOutcome::Children);
/// ```
#[derive(Debug, Clone)]
pub struct FeatureGate<F = ()> {
    feature: FeatureKey,
    fallback: Option<F>,
    show_upgrade_prompt: bool,
    prompt_style: PromptStyle,
    upgrade: UpgradeAction,
}

impl<F> FeatureGate<F> {
    /// Gate on `feature`. Without further configuration a missing feature renders nothing.
    #[must_use]
    pub fn new(feature: impl Into<FeatureKey>) -> Self {
        Self {
            feature: feature.into(),
            fallback: None,
            show_upgrade_prompt: false,
            prompt_style: PromptStyle::default(),
            upgrade: UpgradeAction::default(),
        }
    }

    /// Render `fallback` when the feature is missing. Takes precedence over the prompt.
    #[must_use]
    pub fn with_fallback(mut self, fallback: F) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn with_upgrade_prompt(mut self, style: PromptStyle) -> Self {
        self.show_upgrade_prompt = true;
        self.prompt_style = style;
        self
    }

    #[must_use]
    pub fn with_upgrade_action(mut self, action: UpgradeAction) -> Self {
        self.upgrade = action;
        self
    }

    #[must_use]
    pub fn feature(&self) -> &FeatureKey {
        &self.feature
    }

    #[must_use]
    pub fn upgrade_action(&self) -> &UpgradeAction {
        &self.upgrade
    }

    #[must_use]
    pub fn evaluate(&self, features: &FeatureSet) -> GateOutcome<'_, F> {
        if features.contains(&self.feature) {
            return GateOutcome::Children;
        }
        match (&self.fallback, self.show_upgrade_prompt) {
            (Some(fallback), _) => GateOutcome::Fallback(fallback),
            (None, true) => GateOutcome::UpgradePrompt(self.prompt_style),
            (None, false) => GateOutcome::Nothing,
        }
    }

    /// Run the configured upgrade action.
    ///
    /// Returns the localized billing path to navigate to, if any. A failed
    /// plan upgrade is logged and otherwise ignored: the caller gets `None`
    /// either way.
    #[cfg(feature = "client")]
    pub async fn upgrade(&self, manager: &crate::manager::SessionManager) -> Option<String> {
        match &self.upgrade {
            UpgradeAction::NavigateToBilling { path } => {
                Some(crate::locale::localize_path(&manager.locale(), path))
            }
            UpgradeAction::RequestUpgrade { plan } => {
                if let Err(e) = manager.upgrade_plan(plan).await {
                    tracing::error!(error = %e, feature = %self.feature, plan = %plan, "Plan upgrade failed");
                }
                None
            }
        }
    }
}
