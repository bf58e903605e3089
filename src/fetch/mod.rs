// src/fetch/mod.rs
//! Page retrieval. One strategy per deployment, picked by `fetch_mode`.

pub mod browser;
pub mod http;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{FetchMode, TrackerConfig};
use crate::error::TrackerError;
use crate::extract::PageContent;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self) -> Result<PageContent, TrackerError>;
    fn name(&self) -> &'static str;
}

/// Build the fetcher configured for this deployment.
pub fn from_config(cfg: &TrackerConfig) -> anyhow::Result<Arc<dyn PageFetcher>> {
    let fetcher: Arc<dyn PageFetcher> = match cfg.fetch_mode {
        FetchMode::Plain => Arc::new(http::PlainFetcher::from_config(cfg)?),
        FetchMode::Rendered => Arc::new(browser::RenderedFetcher::from_config(cfg)),
    };
    tracing::info!(
        target: "tracker",
        fetcher = fetcher.name(),
        url = %cfg.campaign_url,
        "fetcher ready"
    );
    Ok(fetcher)
}
