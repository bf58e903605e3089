// src/respond.rs
//! Turns an extraction outcome into the JSON contract, keeping the last good
//! payload around to serve (marked stale) when a later pass fails.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::TrackerError;
use crate::extract::{Method, RaisedValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub total_raised: f64,
    pub total_raised_display: String,
    pub goal: f64,
    pub goal_display: String,
    pub progress_pct: f64,
    /// RFC 3339 / ISO 8601, millisecond precision, UTC.
    pub updated_at: String,
    pub source: String,
    pub method: Method,
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ResultPayload {
    pub fn fresh(found: RaisedValue, goal: f64, source: &str, at: DateTime<Utc>) -> Self {
        Self {
            total_raised: found.value,
            total_raised_display: format_usd(found.value),
            goal,
            goal_display: format_usd(goal),
            progress_pct: progress_pct(found.value, goal),
            updated_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: source.to_string(),
            method: found.method,
            stale: false,
            note: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// `totalRaised / goal * 100`, rounded to two decimals.
pub fn progress_pct(total: f64, goal: f64) -> f64 {
    if !(goal.is_finite() && goal > 0.0) {
        return 0.0;
    }
    (total / goal * 100.0 * 100.0).round() / 100.0
}

/// Whole-dollar US formatting: `186576.4` -> `$186,576`.
pub fn format_usd(v: f64) -> String {
    let whole = v.round().abs() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if v.round() < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Most recent successful payload. Overwritten on success, read on failure,
/// never expires.
#[derive(Debug, Default)]
pub struct LastKnownCache {
    inner: RwLock<Option<ResultPayload>>,
}

impl LastKnownCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ResultPayload> {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn store(&self, payload: ResultPayload) {
        let mut g = match self.inner.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        *g = Some(payload);
    }
}

/// What the endpoint sends back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Fresh {
        payload: ResultPayload,
        cache_control: String,
    },
    Stale(ResultPayload),
    Failed {
        status: StatusCode,
        body: ErrorBody,
    },
}

impl Reply {
    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Fresh { .. } | Reply::Stale(_) => StatusCode::OK,
            Reply::Failed { status, .. } => *status,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Fresh {
                payload,
                cache_control,
            } => {
                let mut resp = (StatusCode::OK, Json(payload)).into_response();
                if let Ok(v) = HeaderValue::from_str(&cache_control) {
                    resp.headers_mut().insert(header::CACHE_CONTROL, v);
                }
                resp
            }
            Reply::Stale(payload) => (StatusCode::OK, Json(payload)).into_response(),
            Reply::Failed { status, body } => (status, Json(body)).into_response(),
        }
    }
}

/// Success: cache and serve fresh. Failure: serve cache as stale, else error.
pub struct Responder {
    cache: LastKnownCache,
    goal: f64,
    source: String,
    cache_control: String,
}

impl Responder {
    pub fn new(goal: f64, source: impl Into<String>, cache_control: impl Into<String>) -> Self {
        Self {
            cache: LastKnownCache::new(),
            goal,
            source: source.into(),
            cache_control: cache_control.into(),
        }
    }

    pub fn cache(&self) -> &LastKnownCache {
        &self.cache
    }

    pub fn resolve(&self, outcome: Result<RaisedValue, TrackerError>) -> Reply {
        self.resolve_at(outcome, Utc::now())
    }

    pub fn resolve_at(&self, outcome: Result<RaisedValue, TrackerError>, now: DateTime<Utc>) -> Reply {
        match outcome {
            Ok(found) => {
                let payload = ResultPayload::fresh(found, self.goal, &self.source, now);
                self.cache.store(payload.clone());
                Reply::Fresh {
                    payload,
                    cache_control: self.cache_control.clone(),
                }
            }
            Err(err) => match self.cache.get() {
                Some(mut last) => {
                    tracing::warn!(
                        target: "tracker",
                        kind = err.kind(),
                        error = %err,
                        cached_at = %last.updated_at,
                        "serving stale payload"
                    );
                    last.stale = true;
                    last.note = Some(err.stale_note());
                    Reply::Stale(last)
                }
                None => {
                    tracing::error!(target: "tracker", kind = err.kind(), error = %err, "no cached payload to fall back on");
                    Reply::Failed {
                        status: err.status(),
                        body: ErrorBody {
                            error: err.headline().to_string(),
                            details: err.details(),
                        },
                    }
                }
            },
        }
    }
}
