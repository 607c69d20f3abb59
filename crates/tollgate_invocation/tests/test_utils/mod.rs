//! Test utilities for invocation tests.
//!
//! This module provides a scripted backend and a harness wiring it to an
//! in-memory ledger and cache driven by a manual clock.

pub mod mock_backend;

#[allow(unused_imports)]
pub use mock_backend::{MockBackend, MockBehavior, MockResponse};

use std::sync::Arc;
use tollgate_cache::ResponseCache;
use tollgate_core::{CacheConfig, InvocationConfig, ManualClock};
use tollgate_invocation::{Invoker, TierModels};
use tollgate_rate_limit::{QuotaLedger, QuotaLimits};
use tollgate_storage::MemoryStore;

pub const PRIMARY_MODEL: &str = "gemini-3-pro-preview";
pub const SECONDARY_MODEL: &str = "gemini-3-flash-preview";

/// Invoker over a mock backend, with handles to everything it touches.
#[allow(dead_code)]
pub struct Harness {
    pub invoker: Invoker,
    pub backend: Arc<MockBackend>,
    pub ledger: Arc<QuotaLedger>,
    pub cache: Arc<ResponseCache>,
    pub store: MemoryStore,
    pub clock: ManualClock,
}

/// Build a harness with default caps and a 1ms backoff unit.
pub async fn harness(backend: MockBackend) -> Harness {
    harness_with(backend, MemoryStore::new(), ManualClock::default()).await
}

/// Build a harness over an existing store and clock.
pub async fn harness_with(backend: MockBackend, store: MemoryStore, clock: ManualClock) -> Harness {
    let backend = Arc::new(backend);
    let ledger = Arc::new(
        QuotaLedger::open(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            QuotaLimits::default(),
        )
        .await
        .unwrap(),
    );
    let cache = Arc::new(ResponseCache::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        CacheConfig::default(),
    ));

    let invoker = Invoker::new(
        Arc::clone(&ledger),
        Arc::clone(&cache),
        backend.clone(),
        InvocationConfig::default().with_backoff_ms(1),
        TierModels::new(PRIMARY_MODEL, SECONDARY_MODEL),
    )
    .unwrap();

    Harness {
        invoker,
        backend,
        ledger,
        cache,
        store,
        clock,
    }
}
