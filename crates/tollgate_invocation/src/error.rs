//! Error types for invocations.

use tollgate_core::ModelTier;
use tollgate_error::{TollgateError, TollgateErrorKind};

/// Result type for invocations.
pub type InvocationResult<T> = Result<T, InvocationError>;

/// Ways an invocation can fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum InvocationErrorKind {
    /// The tier is closed, either by the local ledger or by the provider.
    #[display("Quota exceeded on {} tier: retry after {}s", tier, retry_after_secs)]
    QuotaExceeded {
        /// Tier that refused the call.
        tier: ModelTier,
        /// Seconds until the tier may open again.
        retry_after_secs: u64,
    },

    /// The call kept failing for non-quota reasons.
    #[display("Connection failure after {} attempt(s): {}", attempts, message)]
    ConnectionFailure {
        /// Attempts made before giving up.
        attempts: u32,
        /// Message of the last failure.
        message: String,
    },

    /// Invalid settings or missing credentials.
    #[display("Configuration invalid: {}", _0)]
    Configuration(String),

    /// Ledger or cache persistence failed.
    #[display("Storage failure: {}", _0)]
    Storage(String),
}

/// Invocation error with location tracking.
///
/// # Examples
///
/// ```
/// use tollgate_core::ModelTier;
/// use tollgate_invocation::{InvocationError, InvocationErrorKind};
///
/// let err = InvocationError::new(InvocationErrorKind::QuotaExceeded {
///     tier: ModelTier::Primary,
///     retry_after_secs: 42,
/// });
/// assert!(err.is_quota());
/// assert_eq!(err.retry_after_secs(), Some(42));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Invocation error: {} at {}:{}", kind, file, line)]
pub struct InvocationError {
    /// Error kind.
    pub kind: InvocationErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// File where error occurred.
    pub file: &'static str,
}

impl InvocationError {
    /// Create a new invocation error.
    #[track_caller]
    pub fn new(kind: InvocationErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Check if the invocation was refused for quota reasons.
    pub fn is_quota(&self) -> bool {
        matches!(self.kind, InvocationErrorKind::QuotaExceeded { .. })
    }

    /// Seconds to wait before retrying, for quota failures.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self.kind {
            InvocationErrorKind::QuotaExceeded {
                retry_after_secs, ..
            } => Some(retry_after_secs),
            _ => None,
        }
    }
}

impl From<TollgateError> for InvocationError {
    #[track_caller]
    fn from(e: TollgateError) -> Self {
        match e.kind() {
            TollgateErrorKind::Config(config) => {
                Self::new(InvocationErrorKind::Configuration(config.message.clone()))
            }
            _ => Self::new(InvocationErrorKind::Storage(e.to_string())),
        }
    }
}
