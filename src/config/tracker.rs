// src/config/tracker.rs
//! Service configuration: defaults, then an optional TOML file, then env overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::extract::ExtractPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";
pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";

pub const DEFAULT_GOAL: f64 = 250_000.0;
pub const DEFAULT_MIN_PLAUSIBLE: f64 = 1_000.0;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Which retrieval strategy this deployment uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Plain,
    Rendered,
}

impl FromStr for FetchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "http" => Ok(FetchMode::Plain),
            "rendered" | "browser" | "headless" => Ok(FetchMode::Rendered),
            other => Err(anyhow!("unknown fetch mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Campaign page to scrape.
    pub campaign_url: String,
    pub goal: f64,
    /// Inferential strategies ignore amounts below this.
    pub min_plausible: f64,
    /// Max characters between a RAISED amount and the following GOAL amount.
    pub proximity_window: usize,
    pub fetch_mode: FetchMode,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_ms: u64,
    /// Pause after load so late widgets can render.
    pub render_delay_ms: u64,
    /// Overall budget for the headless session.
    pub nav_timeout_ms: u64,
    pub chrome_path: Option<PathBuf>,
    pub cache_max_age_secs: u64,
    pub cache_swr_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            campaign_url: "https://example.org/campaign".to_string(),
            goal: DEFAULT_GOAL,
            min_plausible: DEFAULT_MIN_PLAUSIBLE,
            proximity_window: 200,
            fetch_mode: FetchMode::Plain,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            request_timeout_ms: 20_000,
            render_delay_ms: 2_500,
            nav_timeout_ms: 90_000,
            chrome_path: None,
            cache_max_age_secs: 120,
            cache_swr_secs: 600,
        }
    }
}

impl TrackerConfig {
    /// Resolve config from:
    /// 1) $TRACKER_CONFIG_PATH (must exist when set)
    /// 2) config/tracker.toml (if present)
    /// 3) built-in defaults
    ///
    /// and then apply `TRACKER_*` env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::from_path(&pb)?
            }
            Err(_) => {
                let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_p.exists() {
                    Self::from_path(&default_p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg.sanitized())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing tracker config at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: TrackerConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    /// Apply `TRACKER_*` overrides. Unparseable values are logged and skipped.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TRACKER_CAMPAIGN_URL") {
            let v = v.trim();
            if !v.is_empty() {
                self.campaign_url = v.to_string();
            }
        }
        if let Some(v) = lookup("TRACKER_FETCH_MODE") {
            match v.parse() {
                Ok(mode) => self.fetch_mode = mode,
                Err(e) => warn!(target: "tracker", error = %e, "ignoring TRACKER_FETCH_MODE"),
            }
        }
        if let Some(p) = lookup("TRACKER_CHROME_PATH") {
            if !p.trim().is_empty() {
                self.chrome_path = Some(PathBuf::from(p.trim()));
            }
        }
        override_num(&lookup, "TRACKER_GOAL", &mut self.goal);
        override_num(&lookup, "TRACKER_MIN_PLAUSIBLE", &mut self.min_plausible);
        override_num(&lookup, "TRACKER_PROXIMITY_WINDOW", &mut self.proximity_window);
        override_num(&lookup, "TRACKER_REQUEST_TIMEOUT_MS", &mut self.request_timeout_ms);
        override_num(&lookup, "TRACKER_RENDER_DELAY_MS", &mut self.render_delay_ms);
        override_num(&lookup, "TRACKER_NAV_TIMEOUT_MS", &mut self.nav_timeout_ms);
        override_num(&lookup, "TRACKER_CACHE_MAX_AGE_SECS", &mut self.cache_max_age_secs);
        override_num(&lookup, "TRACKER_CACHE_SWR_SECS", &mut self.cache_swr_secs);
    }

    fn sanitized(mut self) -> Self {
        if !(self.goal.is_finite() && self.goal > 0.0) {
            warn!(target: "tracker", goal = self.goal, "invalid goal, using default");
            self.goal = DEFAULT_GOAL;
        }
        if !(self.min_plausible.is_finite() && self.min_plausible >= 0.0) {
            self.min_plausible = DEFAULT_MIN_PLAUSIBLE;
        }
        self
    }

    pub fn policy(&self) -> ExtractPolicy {
        ExtractPolicy {
            goal: self.goal,
            min_plausible: self.min_plausible,
            proximity_window: self.proximity_window,
        }
    }

    /// Value of the `Cache-Control` header on fresh responses.
    pub fn cache_control(&self) -> String {
        format!(
            "s-maxage={}, stale-while-revalidate={}",
            self.cache_max_age_secs, self.cache_swr_secs
        )
    }
}

fn override_num<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => warn!(target: "tracker", key, value = %raw, "ignoring unparseable override"),
    }
}
