//! Quota-aware invocation orchestrator.
//!
//! Every invocation walks the same path:
//!
//! ```text
//! resolve tier -> cache lookup -> (hit: return)
//!              -> quota gate   -> (closed: QuotaExceeded)
//!              -> call         -> (ok: cache + record + return)
//!                              -> (transient: back off and retry, or ConnectionFailure)
//!                              -> (quota: hard block + QuotaExceeded)
//! ```

use crate::{
    FailureClass, FailureClassifier, InvocationError, InvocationErrorKind, InvocationMetrics,
    InvocationResult, MessageClassifier,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio_retry2::{Retry, RetryError};
use tollgate_cache::ResponseCache;
use tollgate_core::{GenerateRequest, InvocationConfig, ModelTier, Task, TierPreference};
use tollgate_error::GenerationError;
use tollgate_models::SharedBackend;
use tollgate_rate_limit::{AvailabilitySnapshot, QuotaEvent, QuotaLedger, estimate_tokens};
use tracing::{debug, error, info, instrument, warn};

/// Payload sent by the connection probe.
const PROBE_PAYLOAD: &str = "ping";

/// Model identifiers for each tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierModels {
    /// Model used on the primary tier
    pub primary: String,
    /// Model used on the secondary tier
    pub secondary: String,
}

impl TierModels {
    /// Creates the mapping.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Model for a tier.
    pub fn get(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Primary => &self.primary,
            ModelTier::Secondary => &self.secondary,
        }
    }
}

/// One logical request to the orchestrator.
///
/// # Examples
///
/// ```
/// use tollgate_core::{GenerateRequest, ModelTier, Task, TierPreference};
/// use tollgate_invocation::Invocation;
///
/// let invocation = Invocation::new(Task::LeadEnrichment, GenerateRequest::text("Audit acme.de"))
///     .with_tier(TierPreference::from(ModelTier::Primary))
///     .with_retries(5);
///
/// assert_eq!(invocation.retry_budget(), 5);
/// assert_eq!(
///     Invocation::new(Task::ContentIdeas, GenerateRequest::text("x")).retry_budget(),
///     2
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct Invocation {
    /// Logical task
    #[setters(skip)]
    task: Task,
    /// Payload
    #[setters(skip)]
    request: GenerateRequest,
    /// Requested tier; `Auto` resolves per task
    tier: TierPreference,
    /// Attempt budget override
    #[setters(strip_option)]
    retries: Option<u32>,
    /// Consult and populate the response cache
    use_cache: bool,
}

impl Invocation {
    /// Invocation with automatic tier selection and the task's retry budget.
    pub fn new(task: Task, request: GenerateRequest) -> Self {
        Self {
            task,
            request,
            tier: TierPreference::Auto,
            retries: None,
            use_cache: true,
        }
    }

    /// Attempts allowed: the override, else the task's budget; at least one.
    pub fn retry_budget(&self) -> u32 {
        self.retries.unwrap_or_else(|| self.task.retry_budget()).max(1)
    }
}

/// Result of a connection probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the backend answered
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

/// Why an attempt failed, as seen by the retry loop.
#[derive(Debug)]
enum AttemptFailure {
    Quota(GenerationError),
    Transient(GenerationError),
    Fatal(GenerationError),
}

/// The invocation orchestrator.
///
/// Owns the decision of which tier to use, whether the network is touched at
/// all, and how failures are handled. The ledger and cache are shared with
/// any read-only collaborators through `Arc`.
#[derive(Debug, Getters)]
pub struct Invoker {
    ledger: Arc<QuotaLedger>,
    cache: Arc<ResponseCache>,
    #[getter(skip)]
    backend: SharedBackend,
    #[getter(skip)]
    classifier: Arc<dyn FailureClassifier>,
    config: InvocationConfig,
    models: TierModels,
    #[getter(skip)]
    metrics: InvocationMetrics,
}

impl Invoker {
    /// Creates an orchestrator using the [`MessageClassifier`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid or a model
    /// identifier is empty.
    pub fn new(
        ledger: Arc<QuotaLedger>,
        cache: Arc<ResponseCache>,
        backend: SharedBackend,
        config: InvocationConfig,
        models: TierModels,
    ) -> InvocationResult<Self> {
        config
            .validate()
            .map_err(|e| InvocationError::new(InvocationErrorKind::Configuration(e)))?;
        for tier in ModelTier::ALL {
            if models.get(tier).trim().is_empty() {
                return Err(InvocationError::new(InvocationErrorKind::Configuration(
                    format!("no model configured for {} tier", tier),
                )));
            }
        }

        Ok(Self {
            ledger,
            cache,
            backend,
            classifier: Arc::new(MessageClassifier),
            config,
            models,
            metrics: InvocationMetrics::default(),
        })
    }

    /// Replaces the failure classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Picks the tier for a task and preference.
    ///
    /// An explicit tier is used verbatim. `Auto` uses the task's default tier,
    /// moving primary work to the secondary tier when the primary tier is
    /// blocked for the day or for longer than the fallback threshold.
    #[instrument(skip(self))]
    pub async fn resolve_tier(&self, task: Task, preference: TierPreference) -> ModelTier {
        if let Some(tier) = preference.forced() {
            return tier;
        }

        let default = task.default_tier();
        if default == ModelTier::Primary && self.ledger.should_prefer_secondary().await {
            info!("Primary tier unavailable, falling back to secondary");
            return ModelTier::Secondary;
        }
        default
    }

    /// Runs one invocation and returns the generated text.
    ///
    /// # Errors
    ///
    /// - [`InvocationErrorKind::QuotaExceeded`] if the tier is closed or the
    ///   provider rejects the call for quota reasons
    /// - [`InvocationErrorKind::ConnectionFailure`] once the retry budget is
    ///   spent or a fatal failure occurs
    /// - [`InvocationErrorKind::Storage`] if the cache cannot be read
    ///
    /// Bookkeeping writes that fail after the call are logged; the outcome is
    /// unchanged.
    #[instrument(skip(self, invocation), fields(task = %invocation.task, tier = tracing::field::Empty))]
    pub async fn invoke(&self, invocation: &Invocation) -> InvocationResult<String> {
        let started = Instant::now();
        let task = invocation.task;
        let tier = self.resolve_tier(task, invocation.tier).await;
        tracing::Span::current().record("tier", tier.as_str());
        self.metrics.record_call(tier, task);

        let result = self.invoke_on_tier(invocation, tier, started).await;
        if let Err(e) = &result {
            if e.is_quota() {
                self.metrics.record_quota_rejection(tier, task);
            } else {
                self.metrics.record_failure(tier, task);
            }
        }
        result
    }

    async fn invoke_on_tier(
        &self,
        invocation: &Invocation,
        tier: ModelTier,
        started: Instant,
    ) -> InvocationResult<String> {
        let request = &invocation.request;

        let _flight = if invocation.use_cache {
            let flight = self.cache.in_flight(request, tier).await;

            if let Some(text) = self.cache.lookup(request, tier).await? {
                debug!(chars = text.len(), "Answered from cache");
                if let Err(e) = self.ledger.record_saved_tokens(text.chars().count()).await {
                    error!(error = %e, "Failed to persist saved-token counter");
                }
                self.metrics.record_cache_hit(tier, invocation.task);
                return Ok(text);
            }
            Some(flight)
        } else {
            None
        };

        let permit = self.ledger.admit(tier).await.map_err(|snapshot| {
            info!(
                retry_after_secs = snapshot.next_available_in_secs,
                hard_blocked = snapshot.is_hard_blocked,
                "Quota gate closed"
            );
            InvocationError::new(InvocationErrorKind::QuotaExceeded {
                tier,
                retry_after_secs: snapshot.next_available_in_secs,
            })
        })?;

        let mut outbound = request.clone();
        outbound.config.system_instruction = Some(self.config.system_instruction().clone());

        let text = self
            .call_with_retry(tier, &outbound, invocation.retry_budget())
            .await?;

        if invocation.use_cache {
            if let Err(e) = self.cache.store(request, tier, &text).await {
                error!(error = %e, "Failed to cache response");
            }
        }
        let chars = text.chars().count();
        if let Err(e) = self.ledger.record_success(tier, chars).await {
            error!(error = %e, "Failed to persist request record");
        }
        drop(permit);

        self.metrics.record_success(
            tier,
            invocation.task,
            estimate_tokens(chars),
            started.elapsed().as_secs_f64(),
        );
        Ok(text)
    }

    /// Calls the backend up to `budget` times, backing off linearly between
    /// transient failures.
    async fn call_with_retry(
        &self,
        tier: ModelTier,
        request: &GenerateRequest,
        budget: u32,
    ) -> InvocationResult<String> {
        let model = self.models.get(tier);
        let backoff = self.config.backoff();
        let strategy = (1..budget).map(move |attempt| backoff * attempt);

        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let backend = &self.backend;
        let classifier = &self.classifier;

        let outcome = Retry::spawn(strategy, move || async move {
            let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(attempt, budget, model, "Calling backend");

            match backend.generate(model, request).await {
                Ok(response) => Ok(response.text),
                Err(e) => match classifier.classify(&e) {
                    FailureClass::Quota => {
                        warn!(error = %e, "Provider rejected call for quota reasons");
                        Err(RetryError::Permanent(AttemptFailure::Quota(e)))
                    }
                    FailureClass::Fatal => {
                        warn!(error = %e, "Permanent error, failing immediately");
                        Err(RetryError::Permanent(AttemptFailure::Fatal(e)))
                    }
                    FailureClass::Transient => {
                        if attempt < budget {
                            warn!(error = %e, attempt, "Transient error, will retry");
                        }
                        Err(RetryError::Transient {
                            err: AttemptFailure::Transient(e),
                            retry_after: None,
                        })
                    }
                },
            }
        })
        .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match outcome {
            Ok(text) => Ok(text),
            Err(AttemptFailure::Quota(e)) => {
                warn!(attempts, error = %e.message(), "Blocking tier after quota rejection");
                if let Err(e) = self.ledger.record_hard_block(tier).await {
                    error!(error = %e, "Failed to persist hard block");
                }
                let snapshot = self.ledger.availability(tier).await;
                Err(InvocationError::new(InvocationErrorKind::QuotaExceeded {
                    tier,
                    retry_after_secs: snapshot.next_available_in_secs,
                }))
            }
            Err(AttemptFailure::Transient(e)) | Err(AttemptFailure::Fatal(e)) => {
                warn!(attempts, error = %e, "Giving up");
                Err(InvocationError::new(InvocationErrorKind::ConnectionFailure {
                    attempts,
                    message: e.message(),
                }))
            }
        }
    }

    /// Verifies connectivity with a minimal uncached call.
    ///
    /// Goes through the quota gate like any other call, so a probe against an
    /// exhausted tier reports the exhaustion instead of spending a request.
    #[instrument(skip(self))]
    pub async fn probe(&self) -> ConnectionStatus {
        let invocation = Invocation::new(
            Task::ConnectionProbe,
            GenerateRequest::text(PROBE_PAYLOAD),
        )
        .with_use_cache(false);

        match self.invoke(&invocation).await {
            Ok(_) => {
                let tier = self
                    .resolve_tier(Task::ConnectionProbe, TierPreference::Auto)
                    .await;
                ConnectionStatus {
                    success: true,
                    message: format!("Connected to {}", self.models.get(tier)),
                }
            }
            Err(e) if e.is_quota() => ConnectionStatus {
                success: false,
                message: format!(
                    "Quota exhausted, try again in {}s",
                    e.retry_after_secs().unwrap_or(0)
                ),
            },
            Err(e) => ConnectionStatus {
                success: false,
                message: e.kind.to_string(),
            },
        }
    }

    /// Current availability of a tier.
    pub async fn availability(&self, tier: ModelTier) -> AvailabilitySnapshot {
        self.ledger.availability(tier).await
    }

    /// Estimated tokens consumed by network calls, across restarts.
    pub async fn total_tokens_consumed(&self) -> u64 {
        self.ledger.total_tokens_consumed().await
    }

    /// Estimated tokens saved by cache hits, across restarts.
    pub async fn total_tokens_saved(&self) -> u64 {
        self.ledger.total_tokens_saved().await
    }

    /// Subscribes to availability-changed events.
    pub fn subscribe(&self) -> broadcast::Receiver<QuotaEvent> {
        self.ledger.subscribe()
    }
}
