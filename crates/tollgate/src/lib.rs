//! Tollgate - quota-aware invocation of rate-limited Gemini models
//!
//! Tollgate sits between application code and a rate-limited generation
//! provider with two model tiers. Every call is checked against a durable
//! sliding-window ledger, served from a 24-hour response cache when possible,
//! routed to the secondary tier when the primary one is exhausted, and retried
//! with linear backoff on transient failures.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tollgate::{GenerateRequest, Invocation, Task, Tollgate, TollgateConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tollgate = Tollgate::open(TollgateConfig::load()?).await?;
//!
//!     let invocation = Invocation::new(
//!         Task::LeadEnrichment,
//!         GenerateRequest::text("Audit https://example.com"),
//!     );
//!     let text = tollgate.invoker().invoke(&invocation).await?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `gemini` - Gemini REST backend and [`Tollgate::open`] (default)
//! - `api` - enable tests that call the live API
//!
//! # Architecture
//!
//! - `tollgate_error` - Error types
//! - `tollgate_core` - Tiers, tasks, requests, clock, settings
//! - `tollgate_storage` - Durable key-value store
//! - `tollgate_rate_limit` - Quota ledger and configuration loading
//! - `tollgate_cache` - Response cache and single-flight locks
//! - `tollgate_models` - Generation backends
//! - `tollgate_invocation` - The orchestrator
//!
//! This crate re-exports everything for convenience.

mod app;

pub use app::Tollgate;

pub use tollgate_cache::*;
pub use tollgate_core::*;
pub use tollgate_error::*;
pub use tollgate_invocation::*;
pub use tollgate_models::*;
pub use tollgate_rate_limit::*;
pub use tollgate_storage::*;
