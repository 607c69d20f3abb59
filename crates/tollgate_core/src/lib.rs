//! Core data types for the Tollgate quota-aware invocation layer.
//!
//! This crate provides the foundation types shared by the ledger, the
//! response cache, the provider backends and the orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache_config;
mod clock;
mod invocation_config;
mod request;
mod task;
mod telemetry;
mod tier;

pub use cache_config::{CacheConfig, CacheConfigBuilder};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use invocation_config::InvocationConfig;
pub use request::{GenerateRequest, GenerateRequestBuilder, GenerateResponse, GenerationConfig};
pub use task::Task;
pub use telemetry::init_tracing;
pub use tier::{ModelTier, TierPreference};
