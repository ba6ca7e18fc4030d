// src/utils/config.rs
//! Monitor configuration
//!
//! `MonitorOptions` is what callers hand in: everything but the connection
//! string is optional. `MonitorConfig::resolve` fills in every default and
//! derives the application id from the connection string when none is given.
//!
//! Options can also be loaded from a file layered under `SENTRA_MONITOR_*`
//! environment variables:
//!
//! ```text
//! defaults  <  monitor.toml / .yaml / .json  <  SENTRA_MONITOR_* env
//! ```

use crate::observability::Diagnostics;
use crate::pipeline::integration::Integration;
use crate::reporter::transport::TransportMethod;
use crate::utils::errors::{MonitorError, Result};
use config::{Config as RConfig, Environment as EnvSource, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SAMPLING_RATE: f64 = 1.0;
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const ENV_PREFIX: &str = "SENTRA_MONITOR";

/// Caller-supplied configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    /// Collection endpoint; its last path segment doubles as the app id
    pub connection_string: String,

    /// Explicit application id (derived from the connection string otherwise)
    pub application_id: Option<String>,

    pub enable_error: Option<bool>,
    pub enable_performance: Option<bool>,
    pub enable_behavior: Option<bool>,

    /// Probability in [0, 1] that a capture call is kept
    pub sampling_rate: Option<f64>,

    /// Queue length that triggers an immediate flush
    pub max_queue_size: Option<usize>,

    /// Timer flush period in milliseconds
    pub flush_interval_ms: Option<u64>,

    /// Surface diagnostics through the logging side channel
    pub debug: Option<bool>,

    /// Delivery strategy (beacon when unset)
    pub transport: Option<TransportMethod>,

    /// Make the request strategy wait for the POST to finish
    pub blocking_request: Option<bool>,

    /// Per-request timeout for the HTTP strategies
    pub request_timeout_ms: Option<u64>,

    /// Integrations installed at construction, in order
    #[serde(skip)]
    pub integrations: Vec<Integration>,
}

impl MonitorOptions {
    /// Options with only the connection string set
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Default::default()
        }
    }

    /// Load options from an optional file plus `SENTRA_MONITOR_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = RConfig::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(EnvSource::with_prefix(ENV_PREFIX).try_parsing(true));

        let options: MonitorOptions = builder.build()?.try_deserialize()?;

        if options.connection_string.trim().is_empty() {
            return Err(MonitorError::ConfigError(
                "connection_string is required".to_string(),
            ));
        }

        Ok(options)
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integrations.push(integration);
        self
    }
}

/// Fully populated configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub connection_string: String,
    pub application_id: String,
    pub enable_error: bool,
    pub enable_performance: bool,
    pub enable_behavior: bool,
    pub sampling_rate: f64,
    pub max_queue_size: usize,
    pub flush_interval: Duration,
    pub debug: bool,
    pub transport: TransportMethod,
    pub blocking_request: bool,
    pub request_timeout: Duration,
}

impl MonitorConfig {
    /// Merge options with defaults
    ///
    /// Returns the resolved config and the integrations to install. A
    /// connection string that is not a URL yields an empty application id.
    pub fn resolve(
        mut options: MonitorOptions,
        diagnostics: &Diagnostics,
    ) -> (MonitorConfig, Vec<Integration>) {
        let integrations = std::mem::take(&mut options.integrations);

        let application_id = match options.application_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => derive_application_id(&options.connection_string).unwrap_or_else(|e| {
                diagnostics.warn(format_args!("{}; using an empty application id", e));
                String::new()
            }),
        };

        let sampling_rate = match options.sampling_rate {
            Some(rate) if rate.is_nan() => DEFAULT_SAMPLING_RATE,
            Some(rate) => rate.clamp(0.0, 1.0),
            None => DEFAULT_SAMPLING_RATE,
        };

        let config = MonitorConfig {
            connection_string: options.connection_string,
            application_id,
            enable_error: options.enable_error.unwrap_or(true),
            enable_performance: options.enable_performance.unwrap_or(true),
            enable_behavior: options.enable_behavior.unwrap_or(true),
            sampling_rate,
            max_queue_size: options
                .max_queue_size
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_MAX_QUEUE_SIZE),
            flush_interval: Duration::from_millis(
                options
                    .flush_interval_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_FLUSH_INTERVAL_MS),
            ),
            debug: options.debug.unwrap_or(false),
            transport: options.transport.unwrap_or_default(),
            blocking_request: options.blocking_request.unwrap_or(false),
            request_timeout: Duration::from_millis(
                options
                    .request_timeout_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
        };

        (config, integrations)
    }
}

/// Last non-empty path segment of the connection string
pub fn derive_application_id(connection_string: &str) -> Result<String> {
    let url = Url::parse(connection_string).map_err(|e| {
        MonitorError::ConfigError(format!(
            "invalid connection string {:?}: {}",
            connection_string, e
        ))
    })?;

    Ok(url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default()
        .to_string())
}
