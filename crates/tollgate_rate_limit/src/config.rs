//! Configuration structures for Tollgate.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from tollgate.toml)
//! - User overrides (./tollgate.toml or ~/.config/tollgate/tollgate.toml)
//! - Automatic merging with user values taking precedence

use crate::{QuotaLimits, QuotaWindowLimits};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tollgate_core::{CacheConfig, InvocationConfig, ModelTier};
use tollgate_error::{ConfigError, TollgateError, TollgateResult};
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../tollgate.toml");

/// Model and window caps for one tier.
///
/// # Example
///
/// ```toml
/// [tiers.primary]
/// model = "gemini-3-pro-preview"
/// rpm = 2
/// rpd = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierLimitConfig {
    /// Provider model identifier
    pub model: String,

    /// Requests per minute
    pub rpm: u32,

    /// Requests per day
    pub rpd: u32,
}

impl TierLimitConfig {
    /// Window caps for this tier.
    pub fn limits(&self) -> QuotaWindowLimits {
        QuotaWindowLimits::new(self.rpm, self.rpd)
    }
}

/// Configuration of both tiers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TiersConfig {
    /// Low-volume, high-capability tier
    pub primary: TierLimitConfig,

    /// High-volume, lower-capability tier
    pub secondary: TierLimitConfig,
}

impl TiersConfig {
    /// Settings for one tier.
    pub fn get(&self, tier: ModelTier) -> &TierLimitConfig {
        match tier {
            ModelTier::Primary => &self.primary,
            ModelTier::Secondary => &self.secondary,
        }
    }
}

/// Gemini REST endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeminiConfig {
    /// API base URL, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Location of the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Directory for ledger and cache files; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Top-level Tollgate configuration.
///
/// Loads configuration from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from tollgate.toml)
/// 2. User override (~/.config/tollgate/tollgate.toml, then ./tollgate.toml)
///
/// # Example
///
/// ```no_run
/// use tollgate_rate_limit::TollgateConfig;
/// use tollgate_core::ModelTier;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TollgateConfig::load()?;
/// println!("Primary model: {}", config.tiers.get(ModelTier::Primary).model);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TollgateConfig {
    /// Per-tier models and caps
    pub tiers: TiersConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub invocation: InvocationConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Gemini endpoint settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Durable store settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            tiers: TiersConfig {
                primary: TierLimitConfig {
                    model: "gemini-3-pro-preview".to_string(),
                    rpm: 2,
                    rpd: 50,
                },
                secondary: TierLimitConfig {
                    model: "gemini-3-flash-preview".to_string(),
                    rpm: 15,
                    rpd: 1500,
                },
            },
            invocation: InvocationConfig::default(),
            cache: CacheConfig::default(),
            gemini: GeminiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl TollgateConfig {
    /// Load configuration from a specific file, layered over the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TollgateResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (tollgate.toml shipped with the library)
    /// 2. User config in home directory (~/.config/tollgate/tollgate.toml)
    /// 3. User config in current directory (./tollgate.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or the merged
    /// configuration is invalid.
    #[instrument]
    pub fn load() -> TollgateResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/tollgate/tollgate.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("tollgate").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                TollgateError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check caps, model ids and orchestrator settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid value.
    pub fn validate(&self) -> TollgateResult<()> {
        for tier in ModelTier::ALL {
            let settings = self.tiers.get(tier);
            if settings.model.trim().is_empty() {
                return Err(ConfigError::new(format!("tiers.{}.model must not be empty", tier)).into());
            }
            if settings.rpm == 0 {
                return Err(ConfigError::new(format!("tiers.{}.rpm must be at least 1", tier)).into());
            }
            if settings.rpd == 0 {
                return Err(ConfigError::new(format!("tiers.{}.rpd must be at least 1", tier)).into());
            }
        }

        self.invocation
            .validate()
            .map_err(|e| ConfigError::new(format!("invocation: {}", e)))?;

        if self.gemini.base_url.trim().is_empty() {
            return Err(ConfigError::new("gemini.base_url must not be empty").into());
        }

        Ok(())
    }

    /// Window caps for both tiers.
    pub fn limits(&self) -> QuotaLimits {
        QuotaLimits::new(self.tiers.primary.limits(), self.tiers.secondary.limits())
    }

    /// Model identifier configured for a tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        &self.tiers.get(tier).model
    }

    /// Directory of the durable store.
    ///
    /// Falls back to `<data dir>/tollgate`, or `./.tollgate` on platforms
    /// without a data directory.
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("tollgate")))
            .unwrap_or_else(|| PathBuf::from(".tollgate"))
    }
}
