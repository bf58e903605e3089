use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    routing::{any, get},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::extract::{self, ExtractPolicy, RaisedValue};
use crate::fetch::{self, PageFetcher};
use crate::metrics;
use crate::respond::{Reply, Responder};

#[derive(Clone)]
pub struct AppState {
    fetcher: Arc<dyn PageFetcher>,
    responder: Arc<Responder>,
    policy: ExtractPolicy,
}

impl AppState {
    /// Wire an explicit fetcher (tests inject stubs here).
    pub fn new(fetcher: Arc<dyn PageFetcher>, cfg: &TrackerConfig) -> Self {
        Self {
            fetcher,
            responder: Arc::new(Responder::new(
                cfg.goal,
                cfg.campaign_url.clone(),
                cfg.cache_control(),
            )),
            policy: cfg.policy(),
        }
    }

    /// Build the fetcher selected by `fetch_mode`.
    pub fn from_config(cfg: &TrackerConfig) -> anyhow::Result<Self> {
        let fetcher = fetch::from_config(cfg)?;
        Ok(Self::new(fetcher, cfg))
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/", any(raised))
        .route("/raised", any(raised))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// One fetch -> extract pass. No retries.
pub async fn fetch_and_extract(
    fetcher: &dyn PageFetcher,
    policy: &ExtractPolicy,
) -> Result<RaisedValue, TrackerError> {
    let page = fetcher.fetch().await?;
    extract::extract(&page, policy)
}

async fn raised(State(state): State<AppState>) -> Reply {
    let t0 = Instant::now();
    let outcome = fetch_and_extract(state.fetcher.as_ref(), &state.policy).await;
    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    metrics::record_outcome(&outcome, ms);

    if let Ok(found) = &outcome {
        tracing::info!(
            target: "tracker",
            fetcher = state.fetcher.name(),
            method = %found.method,
            value = found.value,
            ms,
            "raised amount extracted"
        );
    }

    let reply = state.responder.resolve(outcome);
    match &reply {
        Reply::Stale(_) => metrics::record_fallback(true, 200),
        Reply::Failed { status, .. } => metrics::record_fallback(false, status.as_u16()),
        Reply::Fresh { .. } => {}
    }
    reply
}
