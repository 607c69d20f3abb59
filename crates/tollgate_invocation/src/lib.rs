//! Quota-aware invocation orchestrator for Tollgate.
//!
//! The [`Invoker`] is the single choke point for generation calls. For each
//! [`Invocation`] it resolves the tier, answers from the
//! [`ResponseCache`](tollgate_cache::ResponseCache) when it can, refuses calls
//! the [`QuotaLedger`](tollgate_rate_limit::QuotaLedger) says would exceed
//! the caps, retries transient failures with linear backoff, and turns
//! provider quota rejections into a 24-hour block on the tier.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tollgate_cache::ResponseCache;
//! use tollgate_core::{GenerateRequest, InvocationConfig, SystemClock, Task};
//! use tollgate_invocation::{Invocation, Invoker, TierModels};
//! use tollgate_models::GeminiRestBackend;
//! use tollgate_rate_limit::{QuotaLedger, TollgateConfig};
//! use tollgate_storage::FileSystemStore;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TollgateConfig::load()?;
//! let store = Arc::new(FileSystemStore::new(config.storage_path())?);
//! let clock = Arc::new(SystemClock);
//!
//! let ledger = QuotaLedger::open(store.clone(), clock.clone(), config.limits()).await?;
//! let cache = ResponseCache::new(store, clock, config.cache.clone());
//! let invoker = Invoker::new(
//!     Arc::new(ledger),
//!     Arc::new(cache),
//!     Arc::new(GeminiRestBackend::from_env()?),
//!     config.invocation.clone(),
//!     TierModels::new(&config.tiers.primary.model, &config.tiers.secondary.model),
//! )?;
//!
//! let text = invoker
//!     .invoke(&Invocation::new(Task::KnowledgeQuestion, GenerateRequest::text("What is ICP?")))
//!     .await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod error;
mod invoker;
mod metrics;

pub use classify::{FailureClass, FailureClassifier, MessageClassifier, StatusCodeClassifier};
pub use error::{InvocationError, InvocationErrorKind, InvocationResult};
pub use invoker::{ConnectionStatus, Invocation, Invoker, TierModels};
pub use metrics::InvocationMetrics;
