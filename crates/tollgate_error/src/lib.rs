//! Error types for the Tollgate workspace.
//!
//! This crate provides the foundation error types shared by the storage,
//! ledger, cache and provider crates.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use tollgate_error::{StorageError, StorageErrorKind, TollgateResult};
//!
//! fn read_ledger() -> TollgateResult<Vec<u8>> {
//!     Err(StorageError::new(StorageErrorKind::Read("quota/primary/requests".to_string())))?
//! }
//!
//! assert!(read_ledger().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generation;
mod storage;

pub use config::ConfigError;
pub use error::{TollgateError, TollgateErrorKind, TollgateResult};
pub use generation::{GenerationError, GenerationErrorKind, GenerationResult};
pub use storage::{StorageError, StorageErrorKind};
