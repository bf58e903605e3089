// src/error.rs
//! Failure kinds surfaced by a single fetch -> extract pass.

use axum::http::StatusCode;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TrackerError {
    /// Non-success HTTP status or a transport error on the plain fetch path.
    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    /// No extraction strategy produced a plausible amount.
    #[error("no raised amount found on the campaign page")]
    Extraction,

    /// Headless launch, navigation, page read or timeout.
    #[error("headless browser failed: {0}")]
    Browser(String),
}

impl TrackerError {
    /// Status used when there is no cached payload to fall back on.
    pub fn status(&self) -> StatusCode {
        match self {
            TrackerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            TrackerError::Extraction | TrackerError::Browser(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::Upstream(_) => "fetch",
            TrackerError::Extraction => "parse",
            TrackerError::Browser(_) => "browser",
        }
    }

    /// Human-readable `error` field of the hard-failure body.
    pub fn headline(&self) -> &'static str {
        match self {
            TrackerError::Upstream(_) => "Failed to fetch campaign page",
            TrackerError::Extraction => "Could not find raised amount on campaign page",
            TrackerError::Browser(_) => "Headless browser error",
        }
    }

    /// Optional `details` field of the hard-failure body.
    pub fn details(&self) -> Option<String> {
        match self {
            TrackerError::Upstream(d) | TrackerError::Browser(d) => Some(d.clone()),
            TrackerError::Extraction => None,
        }
    }

    /// Note attached to a stale payload served in place of this failure.
    pub fn stale_note(&self) -> String {
        match self {
            TrackerError::Upstream(d) => format!("fetch failed: {d}"),
            TrackerError::Extraction => {
                "parse failed: no raised amount found; serving last known value".to_string()
            }
            TrackerError::Browser(d) => format!("exception: {d}"),
        }
    }
}
