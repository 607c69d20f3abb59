//! Orchestrator configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the invocation orchestrator.
///
/// # Examples
///
/// ```
/// use tollgate_core::InvocationConfig;
/// use std::time::Duration;
///
/// let config = InvocationConfig::default().with_backoff_ms(10);
/// assert_eq!(config.backoff(), Duration::from_millis(10));
/// assert_eq!(config.fallback_threshold(), Duration::from_secs(15));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct InvocationConfig {
    /// Fixed instruction sent with every call
    #[serde(default = "default_system_instruction")]
    #[setters(into)]
    system_instruction: String,

    /// Backoff unit; attempt `n` waits `n * backoff_ms` before retrying
    #[serde(default = "default_backoff_ms")]
    backoff_ms: u64,

    /// Minute-window wait above which `auto` falls back to the secondary tier
    #[serde(default = "default_fallback_threshold_secs")]
    fallback_threshold_secs: u64,
}

fn default_system_instruction() -> String {
    "You are a B2B auditor. Always answer in plain JSON.".to_string()
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_fallback_threshold_secs() -> u64 {
    15
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            backoff_ms: default_backoff_ms(),
            fallback_threshold_secs: default_fallback_threshold_secs(),
        }
    }
}

impl InvocationConfig {
    /// Backoff unit as a duration.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Fallback threshold as a duration.
    pub fn fallback_threshold(&self) -> Duration {
        Duration::from_secs(self.fallback_threshold_secs)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the system instruction is blank or the backoff is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.system_instruction.trim().is_empty() {
            return Err("system_instruction must not be empty".to_string());
        }
        if self.backoff_ms == 0 {
            return Err("backoff_ms must be at least 1".to_string());
        }
        Ok(())
    }
}
