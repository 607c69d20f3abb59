//! Quota ledger and configuration.
//!
//! This crate keeps Tollgate inside the provider's published request caps.
//! The [`QuotaLedger`] tracks, per model tier, sliding one-minute and
//! one-day windows of successful calls plus a 24-hour hard block set when the
//! provider itself rejects a call for quota reasons. All state is persisted
//! through a [`KeyValueStore`](tollgate_storage::KeyValueStore), so windows
//! survive restarts.
//!
//! [`TollgateConfig`] loads the tier caps, model identifiers and orchestrator
//! settings from TOML.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod ledger;

pub use config::{GeminiConfig, StorageConfig, TierLimitConfig, TiersConfig, TollgateConfig};
pub use ledger::{
    AdmissionPermit, AvailabilitySnapshot, QuotaEvent, QuotaEventKind, QuotaLedger, QuotaLimits,
    QuotaWindowLimits, estimate_tokens,
};
