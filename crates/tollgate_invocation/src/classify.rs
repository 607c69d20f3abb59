//! Failure classification.
//!
//! Decides whether a failed call is a provider quota rejection (terminal,
//! closes the tier for a day), a transient failure (retried with backoff)
//! or a fatal one (not retried).

use tollgate_error::GenerationError;

/// Outcome class of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FailureClass {
    /// Provider refused the call for quota reasons
    Quota,
    /// Worth retrying
    Transient,
    /// Retrying cannot help
    Fatal,
}

/// Pluggable failure classifier.
pub trait FailureClassifier: Send + Sync + std::fmt::Debug {
    /// Classify a backend failure.
    fn classify(&self, error: &GenerationError) -> FailureClass;
}

const QUOTA_MARKERS: [&str; 5] = [
    "quota",
    "429",
    "limit",
    "resource_exhausted",
    "resource exhausted",
];

fn mentions_quota(message: &str) -> bool {
    let message = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Classifies by the wording of the error message.
///
/// Any message mentioning `quota`, `429`, `limit` or `resource exhausted`
/// (case-insensitive) is a quota rejection; everything else is transient.
///
/// # Examples
///
/// ```
/// use tollgate_error::{GenerationError, GenerationErrorKind};
/// use tollgate_invocation::{FailureClass, FailureClassifier, MessageClassifier};
///
/// let err = GenerationError::new(GenerationErrorKind::Provider(
///     "RESOURCE_EXHAUSTED: Quota exceeded".to_string(),
/// ));
/// assert_eq!(MessageClassifier.classify(&err), FailureClass::Quota);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageClassifier;

impl FailureClassifier for MessageClassifier {
    fn classify(&self, error: &GenerationError) -> FailureClass {
        if mentions_quota(&error.message()) {
            FailureClass::Quota
        } else {
            FailureClass::Transient
        }
    }
}

/// Classifies by HTTP status first, falling back to message wording.
///
/// 429 is a quota rejection; 400, 401, 403 and 404 are fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCodeClassifier;

impl FailureClassifier for StatusCodeClassifier {
    fn classify(&self, error: &GenerationError) -> FailureClass {
        match error.status_code() {
            Some(429) => FailureClass::Quota,
            Some(400 | 401 | 403 | 404) => FailureClass::Fatal,
            _ => MessageClassifier.classify(error),
        }
    }
}
