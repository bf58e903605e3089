// src/fetch/http.rs
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;

use super::PageFetcher;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::extract::PageContent;

/// Plain GET of the campaign page with browser-like headers.
#[derive(Clone)]
pub struct PlainFetcher {
    url: String,
    client: Client,
}

impl PlainFetcher {
    pub fn from_config(cfg: &TrackerConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&cfg.accept_language).context("accept_language header")?,
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("building http client")?;

        Ok(Self {
            url: cfg.campaign_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl PageFetcher for PlainFetcher {
    async fn fetch(&self) -> Result<PageContent, TrackerError> {
        let resp = match self.client.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "tracker", error = ?e, url = %self.url, "campaign http error");
                return Err(TrackerError::Upstream(e.to_string()));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(target: "tracker", %status, url = %self.url, "campaign non-success status");
            return Err(TrackerError::Upstream(format!("HTTP {}", status.as_u16())));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| TrackerError::Upstream(format!("reading body: {e}")))?;
        Ok(PageContent::from_html(html))
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}
