//! Response cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Configuration for the response cache.
///
/// # Examples
///
/// ```
/// use tollgate_core::CacheConfig;
///
/// let config = CacheConfig::default();
/// assert!(*config.enabled());
/// assert_eq!(*config.ttl_secs(), 86_400);
///
/// let short = CacheConfig::default().with_ttl_secs(60);
/// assert_eq!(*short.ttl_secs(), 60);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,

    /// How long an entry is trusted (seconds)
    #[serde(default = "default_ttl_secs")]
    #[builder(default = "default_ttl_secs()")]
    ttl_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    86_400 // 24 hours
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Trust window as a chrono duration.
    pub fn ttl(&self) -> chrono::Duration {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}
