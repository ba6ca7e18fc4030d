// src/reporter/transport/pixel.rs
//! Query-encoded GET delivery
//!
//! The payload travels as `?data=<percent-encoded JSON>` on a plain GET.
//! URLs have practical length limits, so large batches may be truncated or
//! rejected by intermediaries. Only used when configured explicitly.

use crate::observability::{Diagnostics, TRANSPORT_FAILURES};
use crate::recording::serializer::Payload;
use crate::reporter::transport::{http, Transport};
use crate::utils::errors::{MonitorError, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;

/// Characters left intact by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the GET url carrying `body` in the `data` parameter
pub fn pixel_url(endpoint: &str, body: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{}{}data={}",
        endpoint,
        separator,
        utf8_percent_encode(body, URI_COMPONENT)
    )
}

pub struct PixelTransport {
    timeout: Duration,
    diagnostics: Diagnostics,
}

impl PixelTransport {
    pub fn new(timeout: Duration, diagnostics: Diagnostics) -> Self {
        Self {
            timeout,
            diagnostics,
        }
    }
}

impl Transport for PixelTransport {
    fn name(&self) -> &'static str {
        "pixel"
    }

    fn send(&self, endpoint: &str, payload: &Payload) -> Result<()> {
        let url = pixel_url(endpoint, &payload.body);
        let timeout = self.timeout;
        let diagnostics = self.diagnostics.clone();

        std::thread::Builder::new()
            .name("monitor-pixel".to_string())
            .spawn(move || {
                let result = http::blocking_client(timeout).and_then(|client| http::get(&client, &url));
                if let Err(e) = result {
                    metrics::counter!(TRANSPORT_FAILURES, "strategy" => "pixel").increment(1);
                    diagnostics.warn(format_args!("pixel delivery failed: {}", e));
                }
            })
            .map_err(|e| MonitorError::TransportFailed(format!("Failed to spawn pixel: {}", e)))?;

        Ok(())
    }
}
