//! Top-level error wrapper types.

use crate::{ConfigError, GenerationError, StorageError};

/// Foundation error enum aggregating the workspace's error kinds.
///
/// # Examples
///
/// ```
/// use tollgate_error::{ConfigError, TollgateError};
///
/// let err: TollgateError = ConfigError::new("missing tier").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TollgateErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Durable storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Generation backend error
    #[from(GenerationError)]
    Generation(GenerationError),
}

/// Tollgate error with kind discrimination.
///
/// # Examples
///
/// ```
/// use tollgate_error::{StorageError, StorageErrorKind, TollgateErrorKind, TollgateResult};
///
/// fn might_fail() -> TollgateResult<()> {
///     Err(StorageError::new(StorageErrorKind::Unavailable("disk full".to_string())))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(matches!(err.kind(), TollgateErrorKind::Storage(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Tollgate Error: {}", _0)]
pub struct TollgateError(Box<TollgateErrorKind>);

impl TollgateError {
    /// Create a new error from a kind.
    pub fn new(kind: TollgateErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TollgateErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to TollgateErrorKind
impl<T> From<T> for TollgateError
where
    T: Into<TollgateErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Tollgate operations.
pub type TollgateResult<T> = std::result::Result<T, TollgateError>;
