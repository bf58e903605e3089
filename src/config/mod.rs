// src/config/mod.rs
pub mod tracker;

pub use tracker::{FetchMode, TrackerConfig};
