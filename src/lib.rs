// src/lib.rs
//! Sentra Lab Monitor
//!
//! Client-side telemetry SDK: captures errors, performance measurements and
//! user behavior, samples them, fans them out to observers, and ships them
//! to a collection endpoint in batches.
//!
//! # Architecture
//!
//! - **pipeline**: `Monitor`, the capture API and integration protocol
//! - **integrations**: built-in error, metrics and behavior integrations
//! - **environment**: host capability (url, agent, events, navigation)
//! - **recording**: record model, queue, sampler, batch serializer
//! - **reporter**: batching policy and the four transport strategies
//! - **observability**: tracing, metrics and the debug diagnostics channel
//! - **utils**: configuration, errors, clock
//!
//! # Example
//!
//! ```no_run
//! use sentra_lab_monitor::{Integration, Monitor, MonitorApi, MonitorOptions};
//!
//! let monitor = Monitor::new(
//!     MonitorOptions::new("https://collector.example.com/api/v1/monitoring/abc123")
//!         .with_integration(Integration::errors()),
//! );
//! monitor.capture_error("boom".into(), None);
//! monitor.destroy();
//! ```

// Public module exports
pub mod environment;
pub mod integrations;
pub mod observability;
pub mod pipeline;
pub mod recording;
pub mod reporter;
pub mod utils;

// Re-export commonly used types
pub use environment::{Environment, HostEnvironment, HostEvent, NullEnvironment};
pub use pipeline::{
    Integration, IntegrationContext, IntegrationHooks, Monitor, MonitorApi, MonitorHandle,
    Plugin,
};
pub use recording::{CapturedError, ErrorKind, Extra, Record};
pub use reporter::TransportMethod;
pub use utils::config::{MonitorConfig, MonitorOptions};
pub use utils::errors::{MonitorError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Monitor build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}
