// tests/metrics.rs
//
// Prometheus exposition after driving the raised endpoint in-process.
// One recorder per test binary, shared by every test here.

use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use once_cell::sync::OnceCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use raised_tracker::fetch::PageFetcher;
use raised_tracker::metrics::Metrics;
use raised_tracker::{router, AppState, PageContent, TrackerConfig, TrackerError};

struct QueuedFetcher(Mutex<VecDeque<Result<PageContent, TrackerError>>>);

#[async_trait]
impl PageFetcher for QueuedFetcher {
    async fn fetch(&self) -> Result<PageContent, TrackerError> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TrackerError::Upstream("queue empty".into())))
    }

    fn name(&self) -> &'static str {
        "queued"
    }
}

fn metrics() -> &'static Metrics {
    static METRICS: OnceCell<Metrics> = OnceCell::new();
    METRICS.get_or_init(|| Metrics::install().expect("install recorder"))
}

// Tracker routes plus /metrics, the way the binary wires them.
fn build_app(outcomes: Vec<Result<PageContent, TrackerError>>) -> Router {
    let fetcher = Arc::new(QueuedFetcher(Mutex::new(outcomes.into())));
    router(AppState::new(fetcher, &TrackerConfig::default())).merge(metrics().routes())
}

async fn hit(app: &Router, uri: &str) -> StatusCode {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

async fn scrape(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn success_then_stale_shows_up_in_exposition() {
    let app = build_app(vec![
        Ok(PageContent::from_html("<p>$186,576 RAISED of $250,000 GOAL</p>")),
        Err(TrackerError::Upstream("HTTP 503".into())),
    ]);

    assert_eq!(hit(&app, "/").await, StatusCode::OK);
    assert_eq!(hit(&app, "/").await, StatusCode::OK);

    let text = scrape(&app).await;
    for needle in [
        "tracker_requests_total",
        r#"tracker_extract_method_total{method="raised_label"}"#,
        r#"tracker_fetch_errors_total{kind="fetch"}"#,
        "tracker_stale_served_total",
        "tracker_last_total_raised",
        "tracker_fetch_ms",
        "# HELP tracker_stale_served_total",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}

#[tokio::test]
async fn hard_failure_is_counted_by_status() {
    let app = build_app(vec![Ok(PageContent::from_html("<h1>Welcome</h1>"))]);

    assert_eq!(hit(&app, "/raised").await, StatusCode::INTERNAL_SERVER_ERROR);

    let text = scrape(&app).await;
    assert!(
        text.contains(r#"tracker_hard_errors_total{status="500"}"#),
        "no hard error series\n{text}"
    );
    assert!(
        text.contains(r#"tracker_fetch_errors_total{kind="parse"}"#),
        "no parse error series\n{text}"
    );
}
