//! Per-fingerprint single-flight locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type LockMap = Arc<Mutex<HashMap<String, LockSlot>>>;

/// Lock for one fingerprint and the number of callers holding or awaiting it.
#[derive(Debug, Default)]
struct LockSlot {
    lock: Arc<tokio::sync::Mutex<()>>,
    holders: usize,
}

/// Registry of in-flight fingerprints.
#[derive(Debug, Default, Clone)]
pub(crate) struct InFlightLocks {
    locks: LockMap,
}

impl InFlightLocks {
    pub(crate) async fn acquire(&self, fingerprint: String) -> InFlightGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            let slot = locks.entry(fingerprint.clone()).or_default();
            slot.holders += 1;
            Arc::clone(&slot.lock)
        };

        // Registered before waiting so a cancelled wait still deregisters
        let registration = Registration {
            fingerprint,
            locks: Arc::clone(&self.locks),
        };
        let guard = lock.lock_owned().await;

        InFlightGuard {
            _guard: guard,
            registration,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// One caller's claim on a map slot; the last claim removes the slot.
#[derive(Debug)]
struct Registration {
    fingerprint: String,
    locks: LockMap,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = locks.get_mut(&self.fingerprint) {
            slot.holders = slot.holders.saturating_sub(1);
            if slot.holders == 0 {
                locks.remove(&self.fingerprint);
            }
        }
    }
}

/// Exclusive hold on one request fingerprint.
///
/// Obtained from [`ResponseCache::in_flight`](crate::ResponseCache::in_flight).
/// While held, other callers asking for the same fingerprint wait; once it is
/// dropped the next waiter proceeds and will normally find the cached result.
#[derive(Debug)]
pub struct InFlightGuard {
    // Released before the registration
    _guard: OwnedMutexGuard<()>,
    registration: Registration,
}

impl InFlightGuard {
    /// Fingerprint this guard holds.
    pub fn fingerprint(&self) -> &str {
        &self.registration.fingerprint
    }
}
