// tests/plain_fetch.rs
//
// PlainFetcher against a local mock server: headers sent, status handling,
// and the end-to-end fetch -> extract pass.

use raised_tracker::api::fetch_and_extract;
use raised_tracker::extract::ExtractPolicy;
use raised_tracker::fetch::{self, http::PlainFetcher, PageFetcher};
use raised_tracker::{Method, TrackerConfig, TrackerError};
use wiremock::matchers::{header, header_exists, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cfg_for(server: &MockServer) -> TrackerConfig {
    TrackerConfig {
        campaign_url: format!("{}/c/raise-the-roof", server.uri()),
        request_timeout_ms: 5_000,
        ..TrackerConfig::default()
    }
}

#[tokio::test]
async fn sends_browser_like_headers_and_reads_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/raise-the-roof"))
        // wiremock splits header values on commas
        .and(headers("accept-language", vec!["en-US", "en;q=0.9"]))
        .and(header("cache-control", "no-cache"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<div><span>$186,576</span><span>RAISED</span></div>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = PlainFetcher::from_config(&cfg_for(&server)).unwrap();
    let page = fetcher.fetch().await.unwrap();
    assert_eq!(page.text, "$186,576 RAISED");

    let found = fetch_and_extract(&fetcher, &ExtractPolicy::default())
        .await
        .unwrap();
    assert_eq!(found.value, 186_576.0);
    assert_eq!(found.method, Method::RaisedLabel);
}

#[tokio::test]
async fn non_success_status_is_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let fetcher = PlainFetcher::from_config(&cfg_for(&server)).unwrap();
    assert_eq!(
        fetcher.fetch().await.unwrap_err(),
        TrackerError::Upstream("HTTP 503".into())
    );
}

#[tokio::test]
async fn unreachable_host_is_upstream_failure() {
    let server = MockServer::start().await;
    let cfg = cfg_for(&server);
    drop(server);

    let fetcher = PlainFetcher::from_config(&cfg).unwrap();
    match fetcher.fetch().await {
        Err(TrackerError::Upstream(_)) => {}
        other => panic!("expected upstream failure, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_mode_is_the_default_fetcher() {
    let server = MockServer::start().await;
    let f = fetch::from_config(&cfg_for(&server)).unwrap();
    assert_eq!(f.name(), "plain");
}
