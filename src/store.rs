//! # Transaction Store
//! Owns the 60-slot bucket ring and handles ingestion.
//!
//! Every slot sits behind its own lock, so writers landing in different
//! seconds never contend. The check-reset-merge for one slot happens under
//! that slot's lock. Eviction is lazy: a slot is reset only when `add` or a
//! snapshot touches it and finds a stamp for an older second. A stamp newer
//! than the caller's clock reading is never reset.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::bucket::{expected_second, slot_index, Bucket, WINDOW_SECS};
use crate::clock::{Clock, SystemClock};
use crate::transaction::{IgnoreReason, Outcome, Rejection, Transaction};

/// Sliding-window transaction store shared by all request handlers.
pub struct TransactionStore {
    pub(crate) ring: [Mutex<Bucket>; WINDOW_SECS],
    pub(crate) clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStore")
            .field("window_secs", &WINDOW_SECS)
            .finish_non_exhaustive()
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

impl TransactionStore {
    /// New store with every slot cleared, reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            ring: std::array::from_fn(|_| Mutex::new(Bucket::cleared())),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Ingest one transaction.
    ///
    /// - `timestamp > now` → `Rejected(FutureTimestamp)`, nothing changes.
    /// - second of `timestamp` at or before `now - 60s` → `Ignored(OutOfWindow)`.
    /// - slot already holds a later second → `Ignored(OutOfWindow)`; the
    ///   caller's clock reading lags whoever stamped it.
    /// - otherwise merged into the slot for its second → `Accepted`.
    pub fn add(&self, amount: Decimal, timestamp: DateTime<Utc>) -> Outcome {
        let now = self.clock.now();
        if timestamp > now {
            debug!(%amount, %timestamp, %now, "rejecting transaction from the future");
            return Outcome::Rejected(Rejection::FutureTimestamp);
        }

        let second = timestamp.timestamp();
        if second <= now.timestamp() - WINDOW_SECS as i64 {
            debug!(%amount, %timestamp, %now, "ignoring transaction outside the window");
            return Outcome::Ignored(IgnoreReason::OutOfWindow);
        }

        let idx = slot_index(second);
        let mut bucket = self.ring[idx].lock();
        if bucket.epoch_second > second {
            debug!(%amount, %timestamp, slot_second = bucket.epoch_second, "slot moved on to a later second");
            return Outcome::Ignored(IgnoreReason::OutOfWindow);
        }
        if bucket.epoch_second < second {
            trace!(slot = idx, from = bucket.epoch_second, to = second, "evicting slot on add");
            *bucket = Bucket::empty(second);
        }
        bucket.merge(amount);
        Outcome::Accepted
    }

    /// Convenience for callers holding a validated [`Transaction`].
    pub fn add_transaction(&self, tx: &Transaction) -> Outcome {
        self.add(tx.amount, tx.timestamp)
    }

    /// Force every slot back to the cleared state.
    ///
    /// Each slot is swapped under its own lock; concurrent adds may land
    /// before or after the clear of their slot, never halfway.
    pub fn clear(&self) {
        for slot in &self.ring {
            *slot.lock() = Bucket::cleared();
        }
        debug!("cleared all window slots");
    }

    /// Visit every slot under its lock, resetting stale ones first.
    ///
    /// The closure only ever sees buckets that are fresh relative to
    /// `now_sec`. A stale slot is re-stamped with the second it stands for
    /// now and skipped. A slot stamped after `now_sec` was written by a
    /// caller with a newer clock reading; it is skipped and left intact.
    pub(crate) fn for_each_fresh<F>(&self, now_sec: i64, mut f: F)
    where
        F: FnMut(&Bucket),
    {
        for (idx, slot) in self.ring.iter().enumerate() {
            let mut bucket = slot.lock();
            if bucket.epoch_second > now_sec {
                continue;
            }
            if bucket.is_stale(now_sec) {
                let second = expected_second(idx, now_sec);
                if !bucket.is_empty() {
                    trace!(slot = idx, from = bucket.epoch_second, to = second, "evicting slot on read");
                }
                *bucket = Bucket::empty(second);
                continue;
            }
            f(&bucket);
        }
    }
}
