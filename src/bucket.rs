//! # Bucket
//! One second of the trailing window, reduced to a partial aggregate.
//!
//! The ring holds [`WINDOW_SECS`] of these, indexed by
//! `epoch_second mod WINDOW_SECS`. A slot is reused forever; whenever the
//! second it is asked to represent differs from its stamp, it is reset
//! before anything reads from or merges into it.

use rust_decimal::Decimal;

/// Length of the statistics window in seconds (and number of ring slots).
pub const WINDOW_SECS: usize = 60;

/// Stamp used by `clear()`; no real second ever matches it.
pub(crate) const CLEARED_STAMP: i64 = i64::MIN;

/// Partial aggregate for all transactions that fell into one second.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub epoch_second: i64,
    pub sum: Decimal,
    pub count: u64,
    pub max: Decimal,
    pub min: Decimal,
}

impl Bucket {
    /// Zero aggregate stamped with `epoch_second`.
    ///
    /// `max`/`min` start at the opposite extremes so the first merge
    /// always replaces them; they are never read while `count == 0`.
    pub fn empty(epoch_second: i64) -> Self {
        Self {
            epoch_second,
            sum: Decimal::ZERO,
            count: 0,
            max: Decimal::MIN,
            min: Decimal::MAX,
        }
    }

    /// Zero aggregate that is stale relative to any clock reading.
    pub fn cleared() -> Self {
        Self::empty(CLEARED_STAMP)
    }

    /// Fold a single amount into this bucket.
    pub fn merge(&mut self, amount: Decimal) {
        self.sum = self.sum.saturating_add(amount);
        self.count += 1;
        self.max = self.max.max(amount);
        self.min = self.min.min(amount);
    }

    /// True when the stamp lies in `[now_sec - 59, now_sec]`.
    pub fn is_fresh(&self, now_sec: i64) -> bool {
        self.epoch_second <= now_sec && self.epoch_second > now_sec - WINDOW_SECS as i64
    }

    /// True when the stamp is at or before `now_sec - 60`.
    pub fn is_stale(&self, now_sec: i64) -> bool {
        self.epoch_second <= now_sec - WINDOW_SECS as i64
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Ring slot for a given epoch second.
pub fn slot_index(epoch_second: i64) -> usize {
    epoch_second.rem_euclid(WINDOW_SECS as i64) as usize
}

/// The second that slot `idx` represents when the window ends at `now_sec`.
pub fn expected_second(idx: usize, now_sec: i64) -> i64 {
    now_sec - (now_sec - idx as i64).rem_euclid(WINDOW_SECS as i64)
}
