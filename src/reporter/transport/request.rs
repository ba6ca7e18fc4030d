// src/reporter/transport/request.rs
//! Last-resort POST through the blocking request primitive
//!
//! Each send runs on its own thread with a blocking client. In blocking mode
//! the caller waits for the response and sees the outcome; otherwise the
//! thread is detached.

use crate::observability::{Diagnostics, TRANSPORT_FAILURES};
use crate::recording::serializer::Payload;
use crate::reporter::transport::{http, Transport};
use crate::utils::errors::{MonitorError, Result};
use std::time::Duration;
use tracing::debug;

pub struct RequestTransport {
    timeout: Duration,
    blocking: bool,
    diagnostics: Diagnostics,
}

impl RequestTransport {
    pub fn new(timeout: Duration, blocking: bool, diagnostics: Diagnostics) -> Self {
        Self {
            timeout,
            blocking,
            diagnostics,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }
}

impl Transport for RequestTransport {
    fn name(&self) -> &'static str {
        "request"
    }

    fn send(&self, endpoint: &str, payload: &Payload) -> Result<()> {
        let endpoint = endpoint.to_string();
        let body = payload.body.clone();
        let content_type = payload.content_type();
        let timeout = self.timeout;
        let diagnostics = self.diagnostics.clone();
        let detached = !self.blocking;

        let handle = std::thread::Builder::new()
            .name("monitor-request".to_string())
            .spawn(move || {
                let result = http::blocking_client(timeout)
                    .and_then(|client| http::post(&client, &endpoint, body, content_type));

                if let Err(e) = &result {
                    metrics::counter!(TRANSPORT_FAILURES, "strategy" => "request").increment(1);
                    if detached {
                        diagnostics.warn(format_args!("request delivery failed: {}", e));
                    }
                } else {
                    debug!("Request delivered to {}", endpoint);
                }
                result
            })
            .map_err(|e| MonitorError::TransportFailed(format!("Failed to spawn request: {}", e)))?;

        if self.blocking {
            handle.join().map_err(|_| {
                MonitorError::TransportFailed("request thread panicked".to_string())
            })??;
        }

        Ok(())
    }
}
