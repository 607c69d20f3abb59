//! Response cache implementation.

use crate::InFlightGuard;
use crate::in_flight::InFlightLocks;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tollgate_core::{CacheConfig, GenerateRequest, ModelTier, SharedClock};
use tollgate_error::TollgateResult;
use tollgate_storage::{SharedStore, read_json, write_json};

/// Fingerprint of a request on a tier.
///
/// SHA-256 over the canonical JSON of the request followed by the tier name,
/// hex encoded. Object key order does not affect the result.
///
/// # Examples
///
/// ```
/// use tollgate_cache::fingerprint;
/// use tollgate_core::{GenerateRequest, ModelTier};
///
/// let request = GenerateRequest::text("ping");
/// let primary = fingerprint(&request, ModelTier::Primary);
/// assert_eq!(primary.len(), 64);
/// assert_ne!(primary, fingerprint(&request, ModelTier::Secondary));
/// ```
pub fn fingerprint(request: &GenerateRequest, tier: ModelTier) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.canonical_json().as_bytes());
    hasher.update(tier.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn entry_key(fingerprint: &str) -> String {
    format!("cache/{}", fingerprint)
}

/// Persisted cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct CacheEntry {
    text: String,
    created_at_ms: i64,
}

impl CacheEntry {
    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.created_at_ms).unwrap_or_default()
    }

    /// Whether the entry is older than `ttl` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at() >= ttl
    }
}

/// Durable cache of generated text.
///
/// Entries are keyed by [`fingerprint`] and trusted for the configured TTL
/// (24 hours by default). Expired or unreadable entries are deleted lazily on
/// lookup.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tollgate_cache::ResponseCache;
/// use tollgate_core::{CacheConfig, GenerateRequest, ManualClock, ModelTier};
/// use tollgate_storage::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = ResponseCache::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(ManualClock::default()),
///     CacheConfig::default(),
/// );
///
/// let request = GenerateRequest::text("Summarise Acme Corp");
/// cache.store(&request, ModelTier::Secondary, "{\"summary\":\"...\"}").await?;
///
/// let hit = cache.lookup(&request, ModelTier::Secondary).await?;
/// assert_eq!(hit.as_deref(), Some("{\"summary\":\"...\"}"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResponseCache {
    store: SharedStore,
    clock: SharedClock,
    config: CacheConfig,
    in_flight: InFlightLocks,
}

impl ResponseCache {
    /// Create a cache over `store`.
    pub fn new(store: SharedStore, clock: SharedClock, config: CacheConfig) -> Self {
        tracing::debug!(
            enabled = config.enabled(),
            ttl_secs = config.ttl_secs(),
            "Creating new ResponseCache"
        );
        Self {
            store,
            clock,
            config,
            in_flight: InFlightLocks::default(),
        }
    }

    /// Cache settings.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached text for `request` on `tier`, if present and fresh.
    ///
    /// Returns `None` when caching is disabled, the entry is absent, expired
    /// or unreadable. Expired and unreadable entries are deleted; a failed
    /// delete is logged and still reads as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[tracing::instrument(skip(self, request))]
    pub async fn lookup(
        &self,
        request: &GenerateRequest,
        tier: ModelTier,
    ) -> TollgateResult<Option<String>> {
        if !self.config.enabled() {
            tracing::debug!("Cache disabled, returning None");
            return Ok(None);
        }

        let key = entry_key(&fingerprint(request, tier));
        let entry = match read_json::<CacheEntry>(self.store.as_ref(), &key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!("Cache miss");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cache entry");
                self.purge(&key).await;
                return Ok(None);
            }
        };

        if entry.is_expired(self.clock.now(), self.config.ttl()) {
            tracing::debug!("Cache entry expired, removing");
            self.purge(&key).await;
            return Ok(None);
        }

        tracing::debug!(chars = entry.text.len(), "Cache hit");
        Ok(Some(entry.text))
    }

    async fn purge(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(error = %e, "Failed to purge stale cache entry");
        }
    }

    /// Store `text` for `request` on `tier`, stamped now.
    ///
    /// Overwrites any existing entry. A no-op when caching is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[tracing::instrument(skip(self, request, text), fields(chars = text.len()))]
    pub async fn store(
        &self,
        request: &GenerateRequest,
        tier: ModelTier,
        text: &str,
    ) -> TollgateResult<()> {
        if !self.config.enabled() {
            tracing::debug!("Cache disabled, skipping store");
            return Ok(());
        }

        let entry = CacheEntry {
            text: text.to_string(),
            created_at_ms: self.clock.now().timestamp_millis(),
        };
        write_json(
            self.store.as_ref(),
            &entry_key(&fingerprint(request, tier)),
            &entry,
        )
        .await?;

        tracing::debug!("Stored cache entry");
        Ok(())
    }

    /// Remove the entry for `request` on `tier`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[tracing::instrument(skip(self, request))]
    pub async fn invalidate(&self, request: &GenerateRequest, tier: ModelTier) -> TollgateResult<()> {
        self.store
            .delete(&entry_key(&fingerprint(request, tier)))
            .await
    }

    /// Wait for exclusive hold on the fingerprint of `request` on `tier`.
    ///
    /// Hold the guard across lookup, network call and store so concurrent
    /// identical requests produce a single call.
    pub async fn in_flight(&self, request: &GenerateRequest, tier: ModelTier) -> InFlightGuard {
        self.in_flight.acquire(fingerprint(request, tier)).await
    }
}
