// src/reporter/transport/async_http.rs
//! Non-blocking POST on the current tokio runtime

use crate::observability::{Diagnostics, TRANSPORT_FAILURES};
use crate::recording::serializer::Payload;
use crate::reporter::transport::Transport;
use crate::utils::errors::{MonitorError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Spawns the request and returns immediately
///
/// Unavailable when called outside a tokio runtime. Failures are logged
/// through diagnostics and never retried.
pub struct AsyncHttpTransport {
    client: Option<Client>,
    diagnostics: Diagnostics,
}

impl AsyncHttpTransport {
    pub fn new(timeout: Duration, diagnostics: Diagnostics) -> Self {
        let client = Client::builder().timeout(timeout).build().ok();
        Self {
            client,
            diagnostics,
        }
    }
}

impl Transport for AsyncHttpTransport {
    fn name(&self) -> &'static str {
        "async"
    }

    fn is_available(&self) -> bool {
        self.client.is_some() && Handle::try_current().is_ok()
    }

    fn send(&self, endpoint: &str, payload: &Payload) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or(MonitorError::TransportUnavailable("async"))?;
        let handle = Handle::try_current().map_err(|_| MonitorError::TransportUnavailable("async"))?;

        let request = client
            .post(endpoint)
            .header(CONTENT_TYPE, payload.content_type())
            .body(payload.body.clone());
        let diagnostics = self.diagnostics.clone();
        let records = payload.records;

        handle.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Delivered {} records", records);
                }
                Ok(response) => {
                    metrics::counter!(TRANSPORT_FAILURES, "strategy" => "async").increment(1);
                    diagnostics.warn(format_args!(
                        "collector responded {} for {} records",
                        response.status(),
                        records
                    ));
                }
                Err(e) => {
                    metrics::counter!(TRANSPORT_FAILURES, "strategy" => "async").increment(1);
                    diagnostics.warn(format_args!("failed to send data: {}", e));
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::transport::test_support::{payload, CollectorServer};

    #[tokio::test]
    async fn test_async_post() {
        let mut server = CollectorServer::start().await;
        let transport = AsyncHttpTransport::new(Duration::from_secs(5), Diagnostics::disabled());
        assert!(transport.is_available());

        transport
            .send(&server.url("/api/v1/monitoring/abc123"), &payload(r#"[{"type":"behavior"}]"#))
            .unwrap();

        let request = server.next_request().await;
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/v1/monitoring/abc123");
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        assert_eq!(request.body, r#"[{"type":"behavior"}]"#);
    }

    #[test]
    fn test_unavailable_without_runtime() {
        let transport = AsyncHttpTransport::new(Duration::from_secs(1), Diagnostics::disabled());
        assert!(!transport.is_available());

        let result = transport.send("http://127.0.0.1:9/", &payload("[]"));
        assert!(matches!(result, Err(MonitorError::TransportUnavailable("async"))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_swallowed() {
        let transport = AsyncHttpTransport::new(Duration::from_millis(200), Diagnostics::disabled());
        // Port 9 (discard) is closed on loopback; the spawned task logs and ends
        assert!(transport.send("http://127.0.0.1:9/", &payload("[]")).is_ok());
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
