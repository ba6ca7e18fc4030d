// src/reporter/transport/http.rs
//! Blocking HTTP primitives shared by the thread-backed strategies
//!
//! `reqwest::blocking` clients must be built and dropped off the async
//! runtime, so every caller of these helpers runs on its own OS thread.

use crate::utils::errors::{MonitorError, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

pub(crate) fn blocking_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MonitorError::TransportFailed(format!("Client build error: {}", e)))
}

pub(crate) fn post(client: &Client, endpoint: &str, body: String, content_type: &str) -> Result<()> {
    let response = client
        .post(endpoint)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .map_err(|e| MonitorError::TransportFailed(format!("POST {} failed: {}", endpoint, e)))?;

    check_status(response)
}

pub(crate) fn get(client: &Client, url: &str) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| MonitorError::TransportFailed(format!("GET failed: {}", e)))?;

    check_status(response)
}

fn check_status(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(MonitorError::TransportFailed(format!(
            "collector responded {}",
            status
        )))
    }
}
