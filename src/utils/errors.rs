// src/utils/errors.rs
//! Error taxonomy for the monitor
//!
//! None of these are fatal to the host application. Most are recovered or
//! swallowed inside the pipeline and only surface through diagnostics when
//! `debug` is enabled; `ConfigError` is also returned from option loading.

use thiserror::Error;

/// Monitor error type
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Malformed connection string or unloadable options source
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An observer callback returned an error or panicked
    #[error("Observer failed: {0}")]
    ObserverFailed(String),

    /// The network or delivery worker rejected a batch
    #[error("Transport failed: {0}")]
    TransportFailed(String),

    /// The strategy cannot run on this host; the caller should fall back
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(&'static str),

    /// The batch could not be encoded as JSON
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// An integration could not attach to the environment
    #[error("Integration failed: {0}")]
    IntegrationFailed(String),
}

impl From<config::ConfigError> for MonitorError {
    fn from(err: config::ConfigError) -> Self {
        MonitorError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::SerializationFailed(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, MonitorError>;
