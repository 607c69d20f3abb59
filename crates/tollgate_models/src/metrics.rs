//! Metrics for backend calls.
//!
//! Provides OpenTelemetry-based metrics for tracking provider latency and
//! errors per model.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;
use tollgate_error::{GenerationError, GenerationErrorKind};

static METRICS: OnceLock<BackendMetrics> = OnceLock::new();

/// Metrics for provider API interactions.
///
/// Labeled with provider and model name.
#[derive(Clone)]
pub struct BackendMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Total provider requests
    pub requests: Counter<u64>,
    /// Failed provider requests
    pub errors: Counter<u64>,
    /// Provider call duration in seconds
    pub duration: Histogram<f64>,
}

impl BackendMetrics {
    fn init() -> Self {
        let meter = global::meter("tollgate_models");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("backend.requests")
                .with_description("Total provider requests")
                .build(),
            errors: meter
                .u64_counter("backend.errors")
                .with_description("Failed provider requests")
                .build(),
            duration: meter
                .f64_histogram("backend.duration")
                .with_unit("seconds")
                .with_description("Provider call duration")
                .build(),
        }
    }

    /// Get the global backend metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a completed provider request.
    pub fn record_request(&self, provider: &str, model: &str, duration_secs: f64) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a failed provider request.
    pub fn record_error(&self, provider: &str, model: &str, error_type: &str) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
            KeyValue::new("error_type", error_type.to_string()),
        ];
        self.errors.add(1, labels);
    }
}

impl std::fmt::Debug for BackendMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendMetrics").finish_non_exhaustive()
    }
}

/// Classify a backend error for metrics labeling.
///
/// Returns one of: "rate_limit", "auth", "network", "timeout", "invalid_request",
/// "malformed", "unknown"
pub fn classify_error(error: &GenerationError) -> &'static str {
    match &error.kind {
        GenerationErrorKind::Http { status_code: 429, .. } => "rate_limit",
        GenerationErrorKind::Http {
            status_code: 401 | 403,
            ..
        }
        | GenerationErrorKind::MissingApiKey => "auth",
        GenerationErrorKind::Http { status_code: 400 | 404, .. } => "invalid_request",
        GenerationErrorKind::MalformedResponse(_) => "malformed",
        GenerationErrorKind::Transport(message) => {
            if message.to_lowercase().contains("timed out") {
                "timeout"
            } else {
                "network"
            }
        }
        _ => "unknown",
    }
}
