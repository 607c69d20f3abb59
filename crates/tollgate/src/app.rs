//! Wiring of store, clock, ledger, cache and backend into an orchestrator.

use std::sync::Arc;
use tollgate_cache::ResponseCache;
use tollgate_core::{SharedClock, SystemClock};
use tollgate_invocation::{InvocationError, InvocationErrorKind, InvocationResult, Invoker, TierModels};
use tollgate_models::SharedBackend;
use tollgate_rate_limit::{QuotaLedger, TollgateConfig};
use tollgate_storage::SharedStore;
use tracing::{info, instrument};

/// A fully wired invocation layer.
///
/// Holds the configuration it was built from and the [`Invoker`] that serves
/// calls. The ledger and cache are reachable through the invoker.
#[derive(Debug)]
pub struct Tollgate {
    config: TollgateConfig,
    invoker: Invoker,
}

impl Tollgate {
    /// Opens the layer over the filesystem store and the Gemini REST backend.
    ///
    /// The API key is read from `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key is missing or the settings are
    /// invalid, and a storage error if the store cannot be opened.
    #[cfg(feature = "gemini")]
    #[instrument(skip(config))]
    pub async fn open(config: TollgateConfig) -> InvocationResult<Self> {
        use tollgate_models::GeminiRestBackend;
        use tollgate_storage::FileSystemStore;

        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let backend = GeminiRestBackend::with_endpoint(
            api_key,
            &config.gemini.base_url,
            std::time::Duration::from_secs(config.gemini.timeout_secs),
        )
        .map_err(|e| InvocationError::new(InvocationErrorKind::Configuration(e.kind.to_string())))?;

        let path = config.storage_path();
        info!(path = %path.display(), "Opening durable store");
        let store = FileSystemStore::new(path)?;

        Self::from_parts(
            config,
            Arc::new(store),
            Arc::new(SystemClock),
            Arc::new(backend),
        )
        .await
    }

    /// Builds the layer from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be hydrated from `store` or the
    /// settings are invalid.
    #[instrument(skip_all)]
    pub async fn from_parts(
        config: TollgateConfig,
        store: SharedStore,
        clock: SharedClock,
        backend: SharedBackend,
    ) -> InvocationResult<Self> {
        config.validate()?;

        let ledger = QuotaLedger::open(Arc::clone(&store), Arc::clone(&clock), config.limits())
            .await?
            .with_fallback_threshold(config.invocation.fallback_threshold());
        let cache = ResponseCache::new(store, clock, config.cache.clone());
        let models = TierModels::new(
            config.tiers.primary.model.clone(),
            config.tiers.secondary.model.clone(),
        );

        let invoker = Invoker::new(
            Arc::new(ledger),
            Arc::new(cache),
            backend,
            config.invocation.clone(),
            models,
        )?;

        info!(
            primary = %config.tiers.primary.model,
            secondary = %config.tiers.secondary.model,
            "Tollgate ready"
        );
        Ok(Self { config, invoker })
    }

    /// The orchestrator.
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// The configuration this layer was built from.
    pub fn config(&self) -> &TollgateConfig {
        &self.config
    }
}
