//! # Statistics Aggregator
//! Folds the ring into one [`AggregateSnapshot`].
//!
//! Each query walks all 60 slots once, so its cost does not depend on how
//! many transactions were ever ingested. Stale slots are evicted during the
//! walk and contribute nothing.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::bucket::Bucket;
use crate::store::TransactionStore;

/// Point-in-time statistics over the trailing window. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateSnapshot {
    pub sum: Decimal,
    pub avg: Decimal,
    pub max: Decimal,
    pub min: Decimal,
    pub count: u64,
}

impl AggregateSnapshot {
    /// All-zero snapshot of an empty window.
    pub const EMPTY: AggregateSnapshot = AggregateSnapshot {
        sum: Decimal::ZERO,
        avg: Decimal::ZERO,
        max: Decimal::ZERO,
        min: Decimal::ZERO,
        count: 0,
    };

    /// Round every decimal field half-up to exactly `places` digits.
    pub fn rounded(&self, places: u32) -> AggregateSnapshot {
        let fix = |d: Decimal| {
            let mut r = d.round_dp_with_strategy(
                places,
                rust_decimal::RoundingStrategy::MidpointAwayFromZero,
            );
            r.rescale(places);
            r
        };
        AggregateSnapshot {
            sum: fix(self.sum),
            avg: fix(self.avg),
            max: fix(self.max),
            min: fix(self.min),
            count: self.count,
        }
    }
}

/// Running fold over fresh buckets.
#[derive(Debug, Default, Clone, Copy)]
struct Fold {
    sum: Decimal,
    count: u64,
    max: Option<Decimal>,
    min: Option<Decimal>,
}

impl Fold {
    fn absorb(&mut self, b: &Bucket) {
        if b.is_empty() {
            return;
        }
        self.sum = self.sum.saturating_add(b.sum);
        self.count += b.count;
        self.max = Some(self.max.map_or(b.max, |m| m.max(b.max)));
        self.min = Some(self.min.map_or(b.min, |m| m.min(b.min)));
    }

    fn finish(self) -> AggregateSnapshot {
        if self.count == 0 {
            return AggregateSnapshot::EMPTY;
        }
        AggregateSnapshot {
            sum: self.sum,
            avg: self.sum / Decimal::from(self.count),
            max: self.max.unwrap_or(Decimal::ZERO),
            min: self.min.unwrap_or(Decimal::ZERO),
            count: self.count,
        }
    }
}

impl TransactionStore {
    fn fold(&self) -> Fold {
        let now_sec = self.now().timestamp();
        let mut acc = Fold::default();
        self.for_each_fresh(now_sec, |b| acc.absorb(b));
        acc
    }

    /// Statistics over the trailing 60 seconds.
    pub fn snapshot(&self) -> AggregateSnapshot {
        self.fold().finish()
    }

    /// Number of transactions currently inside the window.
    pub fn count(&self) -> u64 {
        self.fold().count
    }
}
