//! Model tiers and caller-facing tier preferences.

use serde::{Deserialize, Serialize};

/// One of the two concrete model classes quotas are tracked for.
///
/// The lowercase name (`"primary"`, `"secondary"`) is used in storage keys,
/// configuration sections and log fields.
///
/// # Examples
///
/// ```
/// use tollgate_core::ModelTier;
/// use std::str::FromStr;
///
/// assert_eq!(ModelTier::Primary.to_string(), "primary");
/// assert_eq!(ModelTier::from_str("secondary").unwrap(), ModelTier::Secondary);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelTier {
    /// Low-volume, high-capability model
    Primary,
    /// High-volume, lower-capability model
    Secondary,
}

impl ModelTier {
    /// Both tiers, primary first.
    pub const ALL: [ModelTier; 2] = [ModelTier::Primary, ModelTier::Secondary];

    /// Lowercase name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Primary => "primary",
            ModelTier::Secondary => "secondary",
        }
    }
}

/// Tier preference passed by callers.
///
/// `Auto` is never stored; the orchestrator resolves it to a concrete
/// [`ModelTier`] on every invocation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TierPreference {
    /// Let the fallback policy pick
    #[default]
    Auto,
    /// Force the primary tier
    Primary,
    /// Force the secondary tier
    Secondary,
}

impl TierPreference {
    /// The forced tier, or `None` for `Auto`.
    pub fn forced(&self) -> Option<ModelTier> {
        match self {
            TierPreference::Auto => None,
            TierPreference::Primary => Some(ModelTier::Primary),
            TierPreference::Secondary => Some(ModelTier::Secondary),
        }
    }
}

impl From<ModelTier> for TierPreference {
    fn from(tier: ModelTier) -> Self {
        match tier {
            ModelTier::Primary => TierPreference::Primary,
            ModelTier::Secondary => TierPreference::Secondary,
        }
    }
}
