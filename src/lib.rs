// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod respond;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::TrackerConfig;
pub use crate::error::TrackerError;
pub use crate::extract::{extract, Method, PageContent, RaisedValue};
pub use crate::respond::{ResultPayload, Reply};
