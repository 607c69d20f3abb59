//! Response caching with TTL support.
//!
//! This crate provides a durable cache of generated text keyed by a
//! fingerprint of the request payload and the tier that served it, so
//! repeated identical requests within the trust window never reach the
//! network. A per-fingerprint in-flight lock coalesces concurrent identical
//! requests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod in_flight;

pub use cache::{CacheEntry, ResponseCache, fingerprint};
pub use in_flight::InFlightGuard;
