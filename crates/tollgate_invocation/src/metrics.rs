//! Metrics for invocations.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;
use tollgate_core::{ModelTier, Task};

static METRICS: OnceLock<InvocationMetrics> = OnceLock::new();

/// Invocation counters, labeled by tier and task.
///
/// Recorded on the global meter `tollgate_invocation`; a no-op unless the host
/// installs a meter provider.
#[derive(Clone)]
pub struct InvocationMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Invocations started
    pub calls: Counter<u64>,
    /// Invocations answered from cache
    pub cache_hits: Counter<u64>,
    /// Invocations refused for quota reasons
    pub quota_rejections: Counter<u64>,
    /// Invocations that failed after retries
    pub failures: Counter<u64>,
    /// Estimated tokens consumed by network calls
    pub tokens: Counter<u64>,
    /// End-to-end invocation duration in seconds
    pub duration: Histogram<f64>,
}

impl InvocationMetrics {
    fn init() -> Self {
        let meter = global::meter("tollgate_invocation");

        Self {
            _meter: meter.clone(),
            calls: meter
                .u64_counter("invocation.calls")
                .with_description("Invocations started")
                .build(),
            cache_hits: meter
                .u64_counter("invocation.cache_hits")
                .with_description("Invocations answered from cache")
                .build(),
            quota_rejections: meter
                .u64_counter("invocation.quota_rejections")
                .with_description("Invocations refused for quota reasons")
                .build(),
            failures: meter
                .u64_counter("invocation.failures")
                .with_description("Invocations that failed after retries")
                .build(),
            tokens: meter
                .u64_counter("invocation.tokens")
                .with_description("Estimated tokens consumed by network calls")
                .build(),
            duration: meter
                .f64_histogram("invocation.duration")
                .with_unit("seconds")
                .with_description("End-to-end invocation duration")
                .build(),
        }
    }

    /// Get the global invocation metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    fn labels(tier: ModelTier, task: Task) -> [KeyValue; 2] {
        [
            KeyValue::new("tier", tier.as_str()),
            KeyValue::new("task", task.to_string()),
        ]
    }

    /// Record the start of an invocation.
    pub fn record_call(&self, tier: ModelTier, task: Task) {
        self.calls.add(1, &Self::labels(tier, task));
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self, tier: ModelTier, task: Task) {
        self.cache_hits.add(1, &Self::labels(tier, task));
    }

    /// Record a quota refusal.
    pub fn record_quota_rejection(&self, tier: ModelTier, task: Task) {
        self.quota_rejections.add(1, &Self::labels(tier, task));
    }

    /// Record a failed invocation.
    pub fn record_failure(&self, tier: ModelTier, task: Task) {
        self.failures.add(1, &Self::labels(tier, task));
    }

    /// Record a completed network call and its estimated tokens.
    pub fn record_success(&self, tier: ModelTier, task: Task, tokens: u64, duration_secs: f64) {
        let labels = Self::labels(tier, task);
        self.tokens.add(tokens, &labels);
        self.duration.record(duration_secs, &labels);
    }
}

impl std::fmt::Debug for InvocationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationMetrics").finish_non_exhaustive()
    }
}

impl Default for InvocationMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}
