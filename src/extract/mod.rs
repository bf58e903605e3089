// src/extract/mod.rs
//! Ordered extraction heuristics for the "amount raised" figure.
//!
//! Each strategy is a pure function over the fetched page. They are tried in
//! priority order and the first one that yields a plausible value wins:
//!
//! 1. `raised_label`      — `$<amount> RAISED`
//! 2. `structured_data`   — fundraising-looking keys inside inline script JSON
//! 3. `element_scan`      — the smallest DOM block mentioning RAISED (and GOAL)
//! 4. `raised_near_goal`  — a RAISED amount shortly followed by a GOAL amount
//! 5. `largest_amount`    — the largest plausible `$` figure on the page

pub mod elements;
pub mod patterns;
pub mod structured;
pub mod text;

use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::tracker::{DEFAULT_GOAL, DEFAULT_MIN_PLAUSIBLE};
use crate::error::TrackerError;

/// What the fetcher hands to the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// Raw (plain fetch) or rendered (headless) markup.
    pub html: String,
    /// Visible text of the page.
    pub text: String,
}

impl PageContent {
    pub fn new(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            text: text.into(),
        }
    }

    /// Build from markup alone, deriving the visible text.
    pub fn from_html(html: impl Into<String>) -> Self {
        let html = html.into();
        let text = text::visible_text(&html);
        Self { html, text }
    }

    /// Text first, then markup.
    pub(crate) fn haystacks(&self) -> [&str; 2] {
        [self.text.as_str(), self.html.as_str()]
    }
}

/// Provenance tag naming the strategy that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    RaisedLabel,
    StructuredData,
    ElementScan,
    RaisedNearGoal,
    LargestAmount,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::RaisedLabel => "raised_label",
            Method::StructuredData => "structured_data",
            Method::ElementScan => "element_scan",
            Method::RaisedNearGoal => "raised_near_goal",
            Method::LargestAmount => "largest_amount",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaisedValue {
    pub value: f64,
    pub method: Method,
}

/// Knobs shared by all strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractPolicy {
    pub goal: f64,
    /// Inferential strategies ignore amounts below this.
    pub min_plausible: f64,
    /// Max characters between a RAISED amount and its GOAL amount.
    pub proximity_window: usize,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            goal: DEFAULT_GOAL,
            min_plausible: DEFAULT_MIN_PLAUSIBLE,
            proximity_window: 200,
        }
    }
}

impl ExtractPolicy {
    /// Candidate filter for strategies that see the goal figure as just another
    /// number: at least `min_plausible` and not the goal itself.
    pub(crate) fn plausible(&self, v: f64) -> bool {
        v >= self.min_plausible && v != self.goal
    }
}

/// A page as the strategies see it: the fetched content plus its markup
/// parsed once into a DOM.
pub struct PageScan<'a> {
    pub page: &'a PageContent,
    pub doc: Html,
}

impl<'a> PageScan<'a> {
    pub fn new(page: &'a PageContent) -> Self {
        Self {
            page,
            doc: Html::parse_document(&page.html),
        }
    }
}

pub type Strategy = fn(&PageScan<'_>, &ExtractPolicy) -> Option<RaisedValue>;

/// Strategies in priority order.
pub const STRATEGIES: [Strategy; 5] = [
    patterns::raised_label,
    structured::structured_data,
    elements::element_scan,
    patterns::raised_near_goal,
    patterns::largest_amount,
];

/// Run the strategy chain; first positive finite value wins.
pub fn extract(page: &PageContent, policy: &ExtractPolicy) -> Result<RaisedValue, TrackerError> {
    let scan = PageScan::new(page);
    for strategy in STRATEGIES {
        if let Some(found) = strategy(&scan, policy) {
            if found.value.is_finite() && found.value > 0.0 {
                debug!(target: "tracker", method = %found.method, value = found.value, "extracted");
                return Ok(found);
            }
        }
    }
    debug!(
        target: "tracker",
        html_len = page.html.len(),
        text_len = page.text.len(),
        "no strategy matched"
    );
    Err(TrackerError::Extraction)
}

/// Selection policy shared by every stage: drop non-positive values, prefer
/// values at or below the goal (falling back to everything when none are),
/// then take the maximum.
pub fn select_max<I>(candidates: I, goal: f64) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let valid: Vec<f64> = candidates
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    let within = valid.iter().copied().filter(|v| *v <= goal).fold(None, max_opt);
    within.or_else(|| valid.iter().copied().fold(None, max_opt))
}

fn max_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}
