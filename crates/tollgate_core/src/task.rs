//! Logical tasks issued by dashboard surfaces.

use crate::ModelTier;
use serde::{Deserialize, Serialize};

/// A logical generation task and the defaults its call site declares.
///
/// Each task names the tier it prefers when the caller passes
/// [`TierPreference::Auto`](crate::TierPreference::Auto) and how many
/// attempts it is allowed by default.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Task {
    /// Audit a single lead's website and contact details
    LeadEnrichment,
    /// Search for real companies in an industry and location
    LeadProspecting,
    /// Convert a prospecting search result into structured leads
    LeadExtraction,
    /// Draft a campaign with its follow-up tasks
    CampaignPlanning,
    /// Suggest calendar content ideas for a set of leads
    ContentIdeas,
    /// Produce strategic tasks for a set of leads
    StrategicPlan,
    /// Answer a question against the knowledge base
    KnowledgeQuestion,
    /// Write personalised outreach copy
    MarketingCopy,
    /// Minimal request used to verify connectivity and quota
    ConnectionProbe,
}

impl Task {
    /// Tier used when the caller expresses no preference.
    pub fn default_tier(&self) -> ModelTier {
        match self {
            Task::LeadProspecting | Task::StrategicPlan => ModelTier::Primary,
            _ => ModelTier::Secondary,
        }
    }

    /// Number of attempts this call site allows by default.
    pub fn retry_budget(&self) -> u32 {
        match self {
            Task::LeadEnrichment | Task::LeadProspecting => 3,
            Task::ConnectionProbe => 1,
            _ => 2,
        }
    }
}
