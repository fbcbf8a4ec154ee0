//! Lock-free debounce for background refresh triggers.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Shared "next eligible time" guarded by compare-and-swap.
///
/// At most one caller per `min_interval` wins [`try_enter`](Self::try_enter);
/// losers return immediately.
#[derive(Debug)]
pub struct RefreshGate {
    next_eligible_ms: AtomicI64,
    min_interval: Duration,
}

impl RefreshGate {
    pub fn new(min_interval: Duration) -> Self {
        Self { next_eligible_ms: AtomicI64::new(i64::MIN), min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Claim the current interval. `true` means the caller should refresh.
    pub fn try_enter(&self, now: DateTime<Utc>) -> bool {
        let now_ms = now.timestamp_millis();
        let interval_ms = i64::try_from(self.min_interval.as_millis()).unwrap_or(i64::MAX);
        let next_ms = now_ms.saturating_add(interval_ms);

        let mut current = self.next_eligible_ms.load(Ordering::Acquire);
        loop {
            if now_ms < current {
                return false;
            }
            match self.next_eligible_ms.compare_exchange_weak(
                current,
                next_ms,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// `None` until the first successful entry.
    pub fn next_eligible(&self) -> Option<DateTime<Utc>> {
        let ms = self.next_eligible_ms.load(Ordering::Acquire);
        if ms == i64::MIN {
            return None;
        }
        Utc.timestamp_millis_opt(ms).single()
    }
}
