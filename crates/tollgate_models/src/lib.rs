//! Generation backends for Tollgate.
//!
//! A [`GenerationBackend`] performs exactly one network attempt per call:
//! quota accounting, caching and retries all live in the orchestrator. This
//! crate provides the backend trait and the Gemini REST implementation.
//!
//! # Available Backends
//!
//! - **Gemini** (Google) - Enabled by the default `gemini` feature
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "gemini")]
//! # {
//! use tollgate_models::{GeminiRestBackend, GenerationBackend};
//! use tollgate_core::GenerateRequest;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = GeminiRestBackend::from_env()?;
//! let response = backend
//!     .generate("gemini-3-flash-preview", &GenerateRequest::text("Hello"))
//!     .await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod metrics;

pub use backend::{GenerationBackend, SharedBackend};
pub use metrics::{BackendMetrics, classify_error};

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{DEFAULT_BASE_URL, GeminiRestBackend};
