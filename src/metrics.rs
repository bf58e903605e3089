// src/metrics.rs
use axum::{extract::State, routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::error::TrackerError;
use crate::extract::RaisedValue;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Only one recorder per process.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_described();
        Ok(Self { handle })
    }

    /// `/metrics` scrape route, merged next to the tracker routes.
    pub fn routes(&self) -> Router {
        Router::new()
            .route("/metrics", get(scrape))
            .with_state(self.handle.clone())
    }
}

async fn scrape(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_requests_total", "Requests to the raised endpoint.");
        describe_counter!(
            "tracker_fetch_errors_total",
            "Failed passes by kind (fetch, parse, browser)."
        );
        describe_counter!(
            "tracker_extract_method_total",
            "Successful extractions by strategy."
        );
        describe_counter!(
            "tracker_stale_served_total",
            "Failures answered from the last-known cache."
        );
        describe_counter!(
            "tracker_hard_errors_total",
            "Failures answered with an error status."
        );
        describe_histogram!("tracker_fetch_ms", "Fetch + extract time in milliseconds.");
        describe_gauge!(
            "tracker_last_total_raised",
            "Most recent freshly extracted total."
        );
    });
}

pub(crate) fn record_outcome(outcome: &Result<RaisedValue, TrackerError>, ms: f64) {
    counter!("tracker_requests_total").increment(1);
    histogram!("tracker_fetch_ms").record(ms);
    match outcome {
        Ok(found) => {
            counter!("tracker_extract_method_total", "method" => found.method.as_str())
                .increment(1);
            gauge!("tracker_last_total_raised").set(found.value);
        }
        Err(e) => {
            counter!("tracker_fetch_errors_total", "kind" => e.kind()).increment(1);
        }
    }
}

pub(crate) fn record_fallback(stale: bool, status: u16) {
    if stale {
        counter!("tracker_stale_served_total").increment(1);
    } else {
        counter!("tracker_hard_errors_total", "status" => status.to_string()).increment(1);
    }
}
