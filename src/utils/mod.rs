//! # Utility Modules
//!
//! Supporting utilities used by the server binary and the session layer.
//!
//! ## Components
//! - **Logging**: `tracing` subscriber setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: Thread-safe session counters, fed as an event sink

pub mod logging;
pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
