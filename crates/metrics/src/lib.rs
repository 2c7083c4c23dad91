//! Metrics collection and export for stickler.
//!
//! Engine crates record through the `metrics` crate facade using the names in
//! [`definitions`]. When the `prometheus` feature is enabled, [`init_metrics`]
//! installs a Prometheus recorder and, optionally, a scrape endpoint.
//!
//! ```rust,ignore
//! use stickler_metrics::{counter, sticky};
//!
//! counter!(sticky::REPOSTS_TOTAL).increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
