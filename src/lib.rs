// src/lib.rs
//! Real-time statistics over the trailing 60 seconds of transactions.
//!
//! The core is [`TransactionStore`]: a fixed ring of 60 one-second buckets
//! with per-bucket locking and lazy eviction. Ingestion is O(1) and a
//! snapshot is O(60) no matter how many transactions have been seen.
//! [`api`] wraps it in a small Axum service.

pub mod aggregator;
pub mod api;
pub mod bucket;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod store;
pub mod transaction;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::AggregateSnapshot;
pub use crate::api::{router, AppState};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::ServiceConfig;
pub use crate::store::TransactionStore;
pub use crate::transaction::{IgnoreReason, Outcome, Rejection, Transaction};

use std::sync::Arc;

use axum::Router;
use tracing::info;

/// Build the full application router around an existing store.
///
/// `/metrics` is merged in only when `debug_routes` is on.
pub fn app_with_store(config: &ServiceConfig, store: Arc<TransactionStore>) -> anyhow::Result<Router> {
    let state = AppState::new(store).with_decimal_places(config.decimal_places);
    let mut router = api::router(state);
    if config.debug_routes {
        let m = metrics::Metrics::init()?;
        router = router.merge(m.router());
    }
    info!(
        decimal_places = ?config.decimal_places,
        debug_routes = config.debug_routes,
        "statistics service ready"
    );
    Ok(router)
}

/// Build the full application router backed by the wall clock.
pub fn app(config: &ServiceConfig) -> anyhow::Result<Router> {
    app_with_store(config, Arc::new(TransactionStore::with_system_clock()))
}
