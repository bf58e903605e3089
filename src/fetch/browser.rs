// src/fetch/browser.rs
//! Headless Chromium fetch via chromiumoxide.
//!
//! Launch -> navigate -> wait for load -> settle delay -> read markup and
//! `innerText` -> close. The session is released on every exit path,
//! including the overall navigation timeout.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::PageFetcher;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::extract::PageContent;

const VISIBLE_TEXT_JS: &str = "document.body ? document.body.innerText : ''";

pub struct RenderedFetcher {
    url: String,
    user_agent: String,
    chrome_path: Option<PathBuf>,
    render_delay: Duration,
    nav_timeout: Duration,
}

impl RenderedFetcher {
    pub fn from_config(cfg: &TrackerConfig) -> Self {
        Self {
            url: cfg.campaign_url.clone(),
            user_agent: cfg.user_agent.clone(),
            chrome_path: cfg.chrome_path.clone(),
            render_delay: Duration::from_millis(cfg.render_delay_ms),
            nav_timeout: Duration::from_millis(cfg.nav_timeout_ms),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, TrackerError> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", self.user_agent))
            .request_timeout(self.nav_timeout);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| TrackerError::Browser(format!("browser config: {e}")))
    }

    async fn read_page(&self, browser: &Browser) -> Result<PageContent, TrackerError> {
        let page = browser
            .new_page(self.url.as_str())
            .await
            .map_err(step_err("navigate"))?;
        page.wait_for_navigation()
            .await
            .map_err(step_err("wait for load"))?;

        // Late widgets (progress bars, counters) render after load.
        tokio::time::sleep(self.render_delay).await;

        let html = page.content().await.map_err(step_err("read markup"))?;
        let text: String = page
            .evaluate(VISIBLE_TEXT_JS)
            .await
            .map_err(step_err("read text"))?
            .into_value()
            .map_err(step_err("decode text"))?;

        Ok(PageContent::new(html, text))
    }
}

#[async_trait]
impl PageFetcher for RenderedFetcher {
    async fn fetch(&self) -> Result<PageContent, TrackerError> {
        let started = Instant::now();
        let session = BrowserSession::launch(self.browser_config()?).await?;

        let outcome = tokio::time::timeout(self.nav_timeout, self.read_page(&session.browser)).await;
        session.release().await;

        let result = match outcome {
            Ok(res) => res,
            Err(_) => Err(TrackerError::Browser(format!(
                "navigation timed out after {} ms",
                self.nav_timeout.as_millis()
            ))),
        };
        tracing::debug!(
            target: "tracker",
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "rendered fetch finished"
        );
        result
    }

    fn name(&self) -> &'static str {
        "rendered"
    }
}

/// A launched browser plus the task pumping its CDP events.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig) -> Result<Self, TrackerError> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(step_err("launch"))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser, handler })
    }

    /// Close the browser, reap the process and stop the event pump.
    async fn release(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(target: "tracker", error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(target: "tracker", error = %e, "browser wait failed");
        }
        self.handler.abort();
    }
}

fn step_err<E: Display>(step: &'static str) -> impl Fn(E) -> TrackerError {
    move |e| TrackerError::Browser(format!("{step}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_with_chrome(path: &str) -> RenderedFetcher {
        let cfg = TrackerConfig {
            chrome_path: Some(PathBuf::from(path)),
            nav_timeout_ms: 5_000,
            render_delay_ms: 0,
            ..TrackerConfig::default()
        };
        RenderedFetcher::from_config(&cfg)
    }

    #[test]
    fn config_carries_timings() {
        let f = fetcher_with_chrome("/opt/chrome/chrome");
        assert_eq!(f.nav_timeout, Duration::from_secs(5));
        assert_eq!(f.render_delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn missing_browser_surfaces_browser_error() {
        let f = fetcher_with_chrome("/definitely/not/a/chrome-binary");
        match f.fetch().await {
            Err(TrackerError::Browser(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected browser failure, got {other:?}"),
        }
    }
}
