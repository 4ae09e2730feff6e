use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::aggregator::AggregateSnapshot;
use crate::transaction::Outcome;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and describe the series.
    ///
    /// Later calls hand back the same recorder, so building several apps in
    /// one test binary is fine.
    pub fn init() -> anyhow::Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();
        describe();
        Ok(Self { handle })
    }

    /// `/metrics` in Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
    }
}

fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "transactions_accepted_total",
            "Transactions merged into the window."
        );
        describe_counter!(
            "transactions_ignored_total",
            "Valid transactions older than the window."
        );
        describe_counter!(
            "transactions_rejected_total",
            "Transactions refused, labelled by reason."
        );
        describe_counter!("transactions_cleared_total", "Administrative clears.");
        describe_counter!("statistics_requests_total", "Statistics snapshots served.");
        describe_gauge!(
            "statistics_window_count",
            "Transaction count in the most recent snapshot."
        );
    });
}

/// No-ops unless a recorder is installed.
pub fn record_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Accepted => counter!("transactions_accepted_total").increment(1),
        Outcome::Ignored(_) => counter!("transactions_ignored_total").increment(1),
        Outcome::Rejected(_) => {
            counter!("transactions_rejected_total", "reason" => outcome.as_str()).increment(1)
        }
    }
}

pub fn record_invalid(reason: &'static str) {
    counter!("transactions_rejected_total", "reason" => reason).increment(1);
}

pub fn record_clear() {
    counter!("transactions_cleared_total").increment(1);
}

pub fn record_snapshot(s: &AggregateSnapshot) {
    counter!("statistics_requests_total").increment(1);
    gauge!("statistics_window_count").set(s.count as f64);
}
