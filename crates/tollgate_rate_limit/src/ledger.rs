//! Durable sliding-window quota ledger.
//!
//! The ledger keeps, per tier, the timestamps of successful calls over the
//! last 24 hours plus an optional hard-block marker set when the provider
//! itself rejects a call for quota reasons. Availability is derived from
//! these on every read; nothing is decremented or reset on a schedule.
//!
//! State is hydrated from the [`KeyValueStore`](tollgate_storage::KeyValueStore)
//! on open and every mutation writes through, so a restart never resets a
//! window.

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{Mutex, broadcast};
use tollgate_core::{ModelTier, SharedClock};
use tollgate_error::{StorageErrorKind, TollgateError, TollgateErrorKind, TollgateResult};
use tollgate_storage::{KeyValueStore, SharedStore, read_json, write_json};
use tracing::{debug, error, info, instrument, warn};

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const EVENT_CAPACITY: usize = 64;

const TOKENS_CONSUMED_KEY: &str = "usage/tokens_consumed";
const TOKENS_SAVED_KEY: &str = "usage/tokens_saved";

/// Reads a ledger value, treating undecodable bytes as absent.
///
/// Store read failures still propagate.
async fn read_ledger_value<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> TollgateResult<Option<T>> {
    match read_json(store, key).await {
        Err(e) if is_undecodable(&e) => {
            error!(key, error = %e, "Discarding undecodable ledger value");
            Ok(None)
        }
        other => other,
    }
}

fn is_undecodable(err: &TollgateError) -> bool {
    matches!(
        err.kind(),
        TollgateErrorKind::Storage(storage) if matches!(storage.kind, StorageErrorKind::Serialization(_))
    )
}

fn requests_key(tier: ModelTier) -> String {
    format!("quota/{}/requests", tier)
}

fn hard_block_key(tier: ModelTier) -> String {
    format!("quota/{}/hard_block", tier)
}

/// Rough token estimate used for usage accounting: one token per four characters.
///
/// # Examples
///
/// ```
/// use tollgate_rate_limit::estimate_tokens;
///
/// assert_eq!(estimate_tokens(0), 0);
/// assert_eq!(estimate_tokens(9), 3);
/// ```
pub fn estimate_tokens(chars: usize) -> u64 {
    (chars as u64).div_ceil(4)
}

/// Request caps for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotaWindowLimits {
    /// Successful calls allowed in any trailing 60 seconds
    pub requests_per_minute: u32,
    /// Successful calls allowed in any trailing 24 hours
    pub requests_per_day: u32,
}

impl QuotaWindowLimits {
    /// Creates caps from per-minute and per-day limits.
    pub fn new(requests_per_minute: u32, requests_per_day: u32) -> Self {
        Self {
            requests_per_minute,
            requests_per_day,
        }
    }
}

/// Request caps for both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Primary tier caps
    pub primary: QuotaWindowLimits,
    /// Secondary tier caps
    pub secondary: QuotaWindowLimits,
}

impl QuotaLimits {
    /// Creates caps for both tiers.
    pub fn new(primary: QuotaWindowLimits, secondary: QuotaWindowLimits) -> Self {
        Self { primary, secondary }
    }

    /// Caps for one tier.
    pub fn for_tier(&self, tier: ModelTier) -> QuotaWindowLimits {
        match tier {
            ModelTier::Primary => self.primary,
            ModelTier::Secondary => self.secondary,
        }
    }
}

impl Default for QuotaLimits {
    /// 2 rpm / 50 rpd primary, 15 rpm / 1500 rpd secondary.
    fn default() -> Self {
        Self {
            primary: QuotaWindowLimits::new(2, 50),
            secondary: QuotaWindowLimits::new(15, 1500),
        }
    }
}

/// Point-in-time availability of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    /// Tier the snapshot describes
    pub tier: ModelTier,
    /// Configured caps
    pub limits: QuotaWindowLimits,
    /// Calls counted in the trailing minute
    pub rpm_used: u32,
    /// Calls left in the trailing minute
    pub rpm_left: u32,
    /// Calls counted in the trailing day
    pub rpd_used: u32,
    /// Calls left in the trailing day; zero while hard-blocked
    pub rpd_left: u32,
    /// Provider-confirmed quota rejection within the last 24h
    pub is_hard_blocked: bool,
    /// No call may be made right now
    pub is_blocked: bool,
    /// Blocked for the day (daily cap or hard block)
    pub is_daily_blocked: bool,
    /// Whole seconds until the tier may open again; zero when not blocked
    pub next_available_in_secs: u64,
}

/// What changed in a [`QuotaEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuotaEventKind {
    /// A successful call was appended to the windows
    RequestRecorded,
    /// A provider quota rejection was recorded
    HardBlocked,
}

/// Availability-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEvent {
    /// Tier whose availability changed
    pub tier: ModelTier,
    /// Kind of change
    pub kind: QuotaEventKind,
}

#[derive(Debug, Default)]
struct TierState {
    /// Ascending epoch-millisecond timestamps of successful calls
    requests: VecDeque<i64>,
    /// Epoch milliseconds of the last provider quota rejection
    hard_block: Option<i64>,
}

impl TierState {
    fn prune(&mut self, now_ms: i64) {
        while let Some(&oldest) = self.requests.front() {
            if now_ms - oldest >= DAY_MS {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    fn insert(&mut self, at_ms: i64) {
        let index = self.requests.partition_point(|&t| t <= at_ms);
        self.requests.insert(index, at_ms);
    }

    /// Timestamps within the trailing minute, oldest first.
    fn minute_window(&self, now_ms: i64) -> impl Iterator<Item = &i64> {
        self.requests.iter().filter(move |&&t| now_ms - t < MINUTE_MS)
    }

    fn is_hard_blocked(&self, now_ms: i64) -> bool {
        self.hard_block
            .map(|marker| now_ms - marker < DAY_MS)
            .unwrap_or(false)
    }

    /// Prunes, then derives availability. `in_flight` admitted calls count as used.
    fn snapshot(
        &mut self,
        tier: ModelTier,
        limits: QuotaWindowLimits,
        in_flight: u32,
        now_ms: i64,
    ) -> AvailabilitySnapshot {
        self.prune(now_ms);

        let minute_count = self.minute_window(now_ms).count() as u32;
        let day_count = self.requests.len() as u32;
        let rpm_used = minute_count.saturating_add(in_flight);
        let rpd_used = day_count.saturating_add(in_flight);

        let is_hard_blocked = self.is_hard_blocked(now_ms);
        let rpm_left = limits.requests_per_minute.saturating_sub(rpm_used);
        let rpd_left = if is_hard_blocked {
            0
        } else {
            limits.requests_per_day.saturating_sub(rpd_used)
        };

        let is_daily_blocked = rpd_left == 0 || is_hard_blocked;
        let is_blocked = rpm_left == 0 || is_daily_blocked;

        let wait_ms = if is_daily_blocked {
            let mut wait = 0;
            if is_hard_blocked {
                if let Some(marker) = self.hard_block {
                    wait = wait.max(marker + DAY_MS - now_ms);
                }
            }
            if rpd_used >= limits.requests_per_day {
                wait = wait.max(self.day_reopen_ms(now_ms));
            }
            wait
        } else if is_blocked {
            match self.minute_window(now_ms).next() {
                Some(&oldest) => oldest + MINUTE_MS - now_ms,
                // Only in-flight calls hold the window
                None => 1000,
            }
        } else {
            0
        };

        AvailabilitySnapshot {
            tier,
            limits,
            rpm_used,
            rpm_left,
            rpd_used,
            rpd_left,
            is_hard_blocked,
            is_blocked,
            is_daily_blocked,
            next_available_in_secs: ceil_secs(wait_ms),
        }
    }

    fn day_reopen_ms(&self, now_ms: i64) -> i64 {
        match self.requests.front() {
            Some(&oldest) => oldest + DAY_MS - now_ms,
            None => 1000,
        }
    }
}

fn ceil_secs(ms: i64) -> u64 {
    if ms <= 0 { 0 } else { (ms as u64).div_ceil(1000) }
}

#[derive(Debug)]
struct TierSlot {
    state: Mutex<TierState>,
    in_flight: Arc<AtomicU32>,
}

impl TierSlot {
    fn new(state: TierState) -> Self {
        Self {
            state: Mutex::new(state),
            in_flight: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct TokenTotals {
    consumed: u64,
    saved: u64,
}

/// Reservation of one call slot on a tier.
///
/// Returned by [`QuotaLedger::admit`]. While held, the call counts against
/// both windows so concurrent callers cannot overshoot the caps. Dropping the
/// permit releases the reservation; record the outcome with
/// [`QuotaLedger::record_success`] before dropping it.
#[derive(Debug)]
pub struct AdmissionPermit {
    tier: ModelTier,
    in_flight: Arc<AtomicU32>,
}

impl AdmissionPermit {
    /// Tier the slot was reserved on.
    pub fn tier(&self) -> ModelTier {
        self.tier
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Durable per-tier quota ledger.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tollgate_core::{ManualClock, ModelTier};
/// use tollgate_rate_limit::{QuotaLedger, QuotaLimits};
/// use tollgate_storage::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ledger = QuotaLedger::open(
///     Arc::new(MemoryStore::new()),
///     Arc::new(ManualClock::default()),
///     QuotaLimits::default(),
/// )
/// .await?;
///
/// ledger.record_success(ModelTier::Primary, 120).await?;
/// let snapshot = ledger.availability(ModelTier::Primary).await;
/// assert_eq!(snapshot.rpm_left, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QuotaLedger {
    store: SharedStore,
    clock: SharedClock,
    limits: QuotaLimits,
    fallback_threshold_secs: u64,
    primary: TierSlot,
    secondary: TierSlot,
    tokens: Mutex<TokenTotals>,
    events: broadcast::Sender<QuotaEvent>,
}

impl QuotaLedger {
    /// Opens the ledger, hydrating windows, markers and counters from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. Undecodable values are
    /// logged and treated as absent.
    #[instrument(skip(store, clock))]
    pub async fn open(
        store: SharedStore,
        clock: SharedClock,
        limits: QuotaLimits,
    ) -> TollgateResult<Self> {
        let primary = Self::hydrate_tier(&store, ModelTier::Primary).await?;
        let secondary = Self::hydrate_tier(&store, ModelTier::Secondary).await?;

        let consumed = read_ledger_value::<u64>(store.as_ref(), TOKENS_CONSUMED_KEY)
            .await?
            .unwrap_or(0);
        let saved = read_ledger_value::<u64>(store.as_ref(), TOKENS_SAVED_KEY)
            .await?
            .unwrap_or(0);

        info!(
            primary_requests = primary.requests.len(),
            secondary_requests = secondary.requests.len(),
            tokens_consumed = consumed,
            "Opened quota ledger"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            store,
            clock,
            limits,
            fallback_threshold_secs: 15,
            primary: TierSlot::new(primary),
            secondary: TierSlot::new(secondary),
            tokens: Mutex::new(TokenTotals { consumed, saved }),
            events,
        })
    }

    async fn hydrate_tier(store: &SharedStore, tier: ModelTier) -> TollgateResult<TierState> {
        let mut requests: Vec<i64> = read_ledger_value(store.as_ref(), &requests_key(tier))
            .await?
            .unwrap_or_default();
        requests.sort_unstable();
        let hard_block = read_ledger_value::<i64>(store.as_ref(), &hard_block_key(tier)).await?;

        Ok(TierState {
            requests: requests.into(),
            hard_block,
        })
    }

    /// Sets the minute-window wait above which [`should_prefer_secondary`](Self::should_prefer_secondary) holds.
    pub fn with_fallback_threshold(mut self, threshold: std::time::Duration) -> Self {
        self.fallback_threshold_secs = threshold.as_secs();
        self
    }

    /// Configured caps.
    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    fn slot(&self, tier: ModelTier) -> &TierSlot {
        match tier {
            ModelTier::Primary => &self.primary,
            ModelTier::Secondary => &self.secondary,
        }
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn notify(&self, tier: ModelTier, kind: QuotaEventKind) {
        // No receivers is fine
        let _ = self.events.send(QuotaEvent { tier, kind });
    }

    /// Current availability of a tier, ignoring admitted in-flight calls.
    #[instrument(skip(self))]
    pub async fn availability(&self, tier: ModelTier) -> AvailabilitySnapshot {
        let now_ms = self.now_ms();
        let mut state = self.slot(tier).state.lock().await;
        state.snapshot(tier, self.limits.for_tier(tier), 0, now_ms)
    }

    /// Availability of both tiers, primary first.
    pub async fn availability_all(&self) -> Vec<AvailabilitySnapshot> {
        let mut snapshots = Vec::with_capacity(ModelTier::ALL.len());
        for tier in ModelTier::ALL {
            snapshots.push(self.availability(tier).await);
        }
        snapshots
    }

    /// Reserves a call slot if the tier is open.
    ///
    /// The gate check and the reservation happen under the tier lock, with
    /// outstanding permits counted as used capacity.
    ///
    /// # Errors
    ///
    /// Returns the blocking snapshot when the tier is closed.
    #[instrument(skip(self))]
    pub async fn admit(&self, tier: ModelTier) -> Result<AdmissionPermit, AvailabilitySnapshot> {
        let now_ms = self.now_ms();
        let slot = self.slot(tier);
        let mut state = slot.state.lock().await;

        let in_flight = slot.in_flight.load(Ordering::SeqCst);
        let snapshot = state.snapshot(tier, self.limits.for_tier(tier), in_flight, now_ms);
        if snapshot.is_blocked {
            debug!(
                rpm_left = snapshot.rpm_left,
                rpd_left = snapshot.rpd_left,
                hard_blocked = snapshot.is_hard_blocked,
                retry_after_secs = snapshot.next_available_in_secs,
                "Tier closed"
            );
            return Err(snapshot);
        }

        slot.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(AdmissionPermit {
            tier,
            in_flight: Arc::clone(&slot.in_flight),
        })
    }

    /// Records a successful call: appends `now` to the tier's windows and adds
    /// the estimated tokens of a `response_chars`-long reply to the consumed total.
    ///
    /// # Errors
    ///
    /// Returns an error if the write-through fails. In-memory state is already
    /// updated in that case.
    #[instrument(skip(self))]
    pub async fn record_success(&self, tier: ModelTier, response_chars: usize) -> TollgateResult<()> {
        let now_ms = self.now_ms();
        {
            let mut state = self.slot(tier).state.lock().await;
            state.insert(now_ms);
            state.prune(now_ms);
            let requests: Vec<i64> = state.requests.iter().copied().collect();
            write_json(self.store.as_ref(), &requests_key(tier), &requests).await?;
        }

        let tokens = estimate_tokens(response_chars);
        {
            let mut totals = self.tokens.lock().await;
            totals.consumed = totals.consumed.saturating_add(tokens);
            write_json(self.store.as_ref(), TOKENS_CONSUMED_KEY, &totals.consumed).await?;
        }

        debug!(tokens, "Recorded successful call");
        self.notify(tier, QuotaEventKind::RequestRecorded);
        Ok(())
    }

    /// Records a provider-confirmed quota rejection, closing the tier for 24h.
    ///
    /// Overwrites any earlier marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the write-through fails.
    #[instrument(skip(self))]
    pub async fn record_hard_block(&self, tier: ModelTier) -> TollgateResult<()> {
        let now_ms = self.now_ms();
        {
            let mut state = self.slot(tier).state.lock().await;
            state.hard_block = Some(now_ms);
            write_json(self.store.as_ref(), &hard_block_key(tier), &now_ms).await?;
        }

        warn!("Provider quota exhausted; tier blocked for 24h");
        self.notify(tier, QuotaEventKind::HardBlocked);
        Ok(())
    }

    /// Adds the estimated tokens of a `chars`-long cached reply to the saved total.
    ///
    /// # Errors
    ///
    /// Returns an error if the write-through fails.
    #[instrument(skip(self))]
    pub async fn record_saved_tokens(&self, chars: usize) -> TollgateResult<()> {
        let tokens = estimate_tokens(chars);
        let mut totals = self.tokens.lock().await;
        totals.saved = totals.saved.saturating_add(tokens);
        write_json(self.store.as_ref(), TOKENS_SAVED_KEY, &totals.saved).await
    }

    /// Estimated tokens consumed by non-cached calls, across restarts.
    pub async fn total_tokens_consumed(&self) -> u64 {
        self.tokens.lock().await.consumed
    }

    /// Estimated tokens saved by cache hits, across restarts.
    pub async fn total_tokens_saved(&self) -> u64 {
        self.tokens.lock().await.saved
    }

    /// True when callers asking for `auto` should use the secondary tier:
    /// primary is blocked for the day, or minute-blocked for longer than the
    /// fallback threshold.
    #[instrument(skip(self))]
    pub async fn should_prefer_secondary(&self) -> bool {
        let primary = self.availability(ModelTier::Primary).await;
        primary.is_daily_blocked
            || (primary.is_blocked && primary.next_available_in_secs > self.fallback_threshold_secs)
    }

    /// Subscribes to availability-changed events.
    pub fn subscribe(&self) -> broadcast::Receiver<QuotaEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_735_689_600_000;

    fn limits() -> QuotaWindowLimits {
        QuotaWindowLimits::new(2, 50)
    }

    #[test]
    fn empty_state_is_fully_available() {
        let mut state = TierState::default();
        let snap = state.snapshot(ModelTier::Primary, limits(), 0, NOW);
        assert_eq!(snap.rpm_left, 2);
        assert_eq!(snap.rpd_left, 50);
        assert!(!snap.is_blocked);
        assert_eq!(snap.next_available_in_secs, 0);
    }

    #[test]
    fn prune_drops_entries_at_or_beyond_a_day() {
        let mut state = TierState::default();
        state.insert(NOW - DAY_MS);
        state.insert(NOW - DAY_MS + 1);
        state.prune(NOW);
        assert_eq!(state.requests.len(), 1);
    }

    #[test]
    fn insert_keeps_order() {
        let mut state = TierState::default();
        state.insert(NOW);
        state.insert(NOW - 5);
        state.insert(NOW + 5);
        assert_eq!(state.requests, VecDeque::from(vec![NOW - 5, NOW, NOW + 5]));
    }

    #[test]
    fn minute_countdown_rounds_up() {
        let mut state = TierState::default();
        state.insert(NOW - 10_500);
        state.insert(NOW - 5_000);
        let snap = state.snapshot(ModelTier::Primary, limits(), 0, NOW);
        assert!(snap.is_blocked);
        assert!(!snap.is_daily_blocked);
        assert_eq!(snap.next_available_in_secs, 50);
    }

    #[test]
    fn in_flight_counts_against_caps() {
        let mut state = TierState::default();
        state.insert(NOW - 1_000);
        let snap = state.snapshot(ModelTier::Primary, limits(), 1, NOW);
        assert_eq!(snap.rpm_used, 2);
        assert!(snap.is_blocked);
    }

    #[test]
    fn ceil_secs_clamps_negative() {
        assert_eq!(ceil_secs(-5), 0);
        assert_eq!(ceil_secs(1), 1);
        assert_eq!(ceil_secs(1000), 1);
        assert_eq!(ceil_secs(1001), 2);
    }
}
