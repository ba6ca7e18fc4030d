// src/observability/mod.rs
//! Logging, metrics, and the debug diagnostics channel
//!
//! - **init_tracing**: `tracing-subscriber` fmt layer driven by `RUST_LOG`
//! - **init_metrics**: Prometheus recorder for the `monitor_*` counters
//! - **Diagnostics**: debug-gated side channel used inside the pipeline

pub mod diagnostics;

pub use diagnostics::{DiagnosticLevel, DiagnosticSink, Diagnostics, MemorySink, TracingSink};

use crate::utils::errors::{MonitorError, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// Metric names
pub const RECORDS_CAPTURED: &str = "monitor_records_captured_total";
pub const RECORDS_SAMPLED_OUT: &str = "monitor_records_sampled_out_total";
pub const OBSERVER_FAILURES: &str = "monitor_observer_failures_total";
pub const BATCHES_SENT: &str = "monitor_batches_sent_total";
pub const TRANSPORT_FAILURES: &str = "monitor_transport_failures_total";

/// Install the global tracing subscriber
///
/// `SENTRA_MONITOR_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SENTRA_MONITOR_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .try_init()
    };

    result.map_err(|e| MonitorError::ConfigError(format!("Failed to init tracing: {}", e)))
}

/// Install the Prometheus metrics recorder
///
/// The returned handle renders the current counters in text exposition format.
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MonitorError::ConfigError(format!("Failed to init metrics: {}", e)))
}
