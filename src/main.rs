//! Raised Tracker — Binary Entrypoint
//! Boots the Axum HTTP server on Shuttle, wiring config, the configured
//! fetcher, the last-known cache and (optionally) `/metrics`.

use raised_tracker::{logging, metrics::Metrics, router, AppState, TrackerConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    logging::init();

    let cfg = TrackerConfig::load()?;
    tracing::info!(
        target: "tracker",
        url = %cfg.campaign_url,
        mode = ?cfg.fetch_mode,
        goal = cfg.goal,
        "config loaded"
    );

    let state = AppState::from_config(&cfg)?;
    let mut app = router(state);

    if std::env::var("METRICS_ROUTE").ok().as_deref() == Some("1") {
        match Metrics::install() {
            Ok(m) => app = app.merge(m.routes()),
            Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
        }
    }

    Ok(app.into())
}
