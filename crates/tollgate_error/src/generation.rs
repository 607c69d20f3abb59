//! Generation backend error types.

/// Failure conditions reported by a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// API key not found in environment
    #[display("GEMINI_API_KEY environment variable not set")]
    MissingApiKey,
    /// Failed to create the HTTP client
    #[display("Failed to create generation client: {}", _0)]
    ClientCreation(String),
    /// Request never produced an HTTP response (DNS, TLS, timeout, reset)
    #[display("Transport failure: {}", _0)]
    Transport(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message (usually the provider's error body)
        message: String,
    },
    /// Response body could not be interpreted
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
    /// Provider reported an error without an HTTP status
    #[display("Provider error: {}", _0)]
    Provider(String),
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use tollgate_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::Http {
///     status_code: 429,
///     message: "RESOURCE_EXHAUSTED".to_string(),
/// });
/// assert_eq!(err.status_code(), Some(429));
/// assert!(err.message().contains("RESOURCE_EXHAUSTED"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// HTTP status code, when the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match &self.kind {
            GenerationErrorKind::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Human-readable message without source location.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Result type for generation backends.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
