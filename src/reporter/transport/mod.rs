// src/reporter/transport/mod.rs
//! Delivery strategies
//!
//! ```text
//! ┌────────────┐   Payload   ┌────────────────────┐
//! │  Reporter  │────────────▶│ TransportDispatcher│
//! └────────────┘             └─────────┬──────────┘
//!                                      │ first available in chain
//!        ┌──────────────┬──────────────┼──────────────┐
//!        ▼              ▼              ▼              ▼
//!   ┌─────────┐   ┌───────────┐   ┌─────────┐   ┌─────────┐
//!   │ beacon  │──▶│   async   │──▶│ request │   │  pixel  │
//!   └─────────┘   └───────────┘   └─────────┘   └─────────┘
//! ```
//!
//! A strategy that is unavailable, or that refuses the payload with
//! `TransportUnavailable`, hands over to the next in its chain. Any other
//! failure is logged and the batch is dropped.

pub mod async_http;
pub mod beacon;
mod http;
pub mod pixel;
pub mod request;

pub use async_http::AsyncHttpTransport;
pub use beacon::BeaconTransport;
pub use pixel::{pixel_url, PixelTransport};
pub use request::RequestTransport;

use crate::observability::{Diagnostics, BATCHES_SENT, TRANSPORT_FAILURES};
use crate::recording::serializer::Payload;
use crate::utils::errors::{MonitorError, Result};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A way of getting a payload to the collection endpoint
pub trait Transport: Send + Sync {
    /// Strategy name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Whether the strategy can be used right now
    fn is_available(&self) -> bool {
        true
    }

    /// Hand the payload off for delivery
    fn send(&self, endpoint: &str, payload: &Payload) -> Result<()>;
}

/// Configured delivery strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMethod {
    /// Background worker, falls back to async then request
    #[default]
    Beacon,
    /// Spawned on the tokio runtime, falls back to request
    #[serde(alias = "fetch")]
    Async,
    /// Dedicated thread, optionally waited on
    #[serde(alias = "xhr")]
    Request,
    /// GET with the payload in the query string
    #[serde(alias = "img")]
    Pixel,
}

impl TransportMethod {
    /// Strategies tried for this method, in order
    pub fn chain(self) -> &'static [TransportMethod] {
        match self {
            TransportMethod::Beacon => &[
                TransportMethod::Beacon,
                TransportMethod::Async,
                TransportMethod::Request,
            ],
            TransportMethod::Async => &[TransportMethod::Async, TransportMethod::Request],
            TransportMethod::Request => &[TransportMethod::Request],
            TransportMethod::Pixel => &[TransportMethod::Pixel],
        }
    }
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportMethod::Beacon => "beacon",
            TransportMethod::Async => "async",
            TransportMethod::Request => "request",
            TransportMethod::Pixel => "pixel",
        };
        f.write_str(name)
    }
}

/// One instance of every strategy
#[derive(Clone)]
pub struct Transports {
    pub beacon: Arc<dyn Transport>,
    pub async_http: Arc<dyn Transport>,
    pub request: Arc<dyn Transport>,
    pub pixel: Arc<dyn Transport>,
}

impl Transports {
    /// The real HTTP strategies
    pub fn http(timeout: Duration, blocking_request: bool, diagnostics: Diagnostics) -> Self {
        Self {
            beacon: Arc::new(BeaconTransport::spawn(timeout, diagnostics.clone())),
            async_http: Arc::new(AsyncHttpTransport::new(timeout, diagnostics.clone())),
            request: Arc::new(RequestTransport::new(
                timeout,
                blocking_request,
                diagnostics.clone(),
            )),
            pixel: Arc::new(PixelTransport::new(timeout, diagnostics)),
        }
    }

    /// Use the same transport for every strategy
    pub fn uniform(transport: Arc<dyn Transport>) -> Self {
        Self {
            beacon: transport.clone(),
            async_http: transport.clone(),
            request: transport.clone(),
            pixel: transport,
        }
    }

    pub fn get(&self, method: TransportMethod) -> &Arc<dyn Transport> {
        match method {
            TransportMethod::Beacon => &self.beacon,
            TransportMethod::Async => &self.async_http,
            TransportMethod::Request => &self.request,
            TransportMethod::Pixel => &self.pixel,
        }
    }
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transports")
            .field("beacon", &self.beacon.name())
            .field("async_http", &self.async_http.name())
            .field("request", &self.request.name())
            .field("pixel", &self.pixel.name())
            .finish()
    }
}

/// Outcome of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed off by the named strategy
    Sent(TransportMethod),
    /// The strategy accepted the payload but reported a failure
    Failed(TransportMethod),
    /// Nothing in the chain was available
    NoTransport,
}

/// Routes payloads through the configured strategy chain
#[derive(Debug)]
pub struct TransportDispatcher {
    method: TransportMethod,
    endpoint: String,
    transports: Transports,
    diagnostics: Diagnostics,
}

impl TransportDispatcher {
    pub fn new(
        method: TransportMethod,
        endpoint: impl Into<String>,
        transports: Transports,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            transports,
            diagnostics,
        }
    }

    pub fn method(&self) -> TransportMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one payload; never fails the caller
    pub fn dispatch(&self, payload: &Payload) -> DispatchOutcome {
        for &candidate in self.method.chain() {
            let transport = self.transports.get(candidate);
            if !transport.is_available() {
                debug!("Transport {} unavailable, trying next", candidate);
                continue;
            }

            match transport.send(&self.endpoint, payload) {
                Ok(()) => {
                    metrics::counter!(BATCHES_SENT, "strategy" => transport.name()).increment(1);
                    debug!(
                        "Dispatched {} records ({} bytes) via {}",
                        payload.records,
                        payload.len(),
                        candidate
                    );
                    return DispatchOutcome::Sent(candidate);
                }
                Err(MonitorError::TransportUnavailable(name)) => {
                    debug!("Transport {} refused payload, trying next", name);
                    continue;
                }
                Err(e) => {
                    metrics::counter!(TRANSPORT_FAILURES, "strategy" => transport.name())
                        .increment(1);
                    warn!("Transport {} failed: {}", candidate, e);
                    self.diagnostics
                        .error(format_args!("failed to send data: {}", e));
                    return DispatchOutcome::Failed(candidate);
                }
            }
        }

        warn!("No transport available for {} records", payload.records);
        self.diagnostics
            .error(format_args!("no transport available for {}", self.method));
        DispatchOutcome::NoTransport
    }
}
