// src/main.rs
//! Sentra Lab Monitor demo host
//!
//! Loads options from an optional config file plus `SENTRA_MONITOR_*`
//! variables, attaches the built-in integrations to an in-process host, and
//! reports until interrupted.
//!
//! ```text
//! sentra-monitor [monitor.toml]
//! ```

use anyhow::{Context, Result};
use sentra_lab_monitor::environment::{ClickEvent, HostEnvironment, HostEvent, VitalMetric};
use sentra_lab_monitor::observability::{init_metrics, init_tracing};
use sentra_lab_monitor::{BuildInfo, Integration, Monitor, MonitorApi, MonitorOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize observability (tracing, metrics)
    init_tracing()?;
    let metrics = init_metrics()?;

    let build = BuildInfo::current();
    info!(
        "Starting Sentra Lab Monitor v{} ({})",
        build.version, build.git_hash
    );

    // Load configuration
    let path = std::env::args().nth(1).map(PathBuf::from);
    let mut options =
        MonitorOptions::load(path.as_deref()).context("Failed to load monitor options")?;
    options.integrations = Integration::defaults();

    let host = Arc::new(HostEnvironment::new(
        "app://sentra-monitor/",
        format!("sentra-monitor/{}", build.version),
    ));
    let monitor = Monitor::builder(options).environment(host.clone()).build();
    info!(
        "Monitor ready: app_id={:?} session={} integrations={:?}",
        monitor.config().application_id,
        monitor.session_id(),
        monitor.integration_names()
    );

    // A few host events so the first batch has something in it
    host.dispatch(HostEvent::PageShow { persisted: false });
    host.dispatch(HostEvent::Vital(VitalMetric {
        name: "TTFB".to_string(),
        value: 120.0,
        navigation_type: Some("navigate".to_string()),
    }));
    host.dispatch(HostEvent::Click(ClickEvent {
        target: "body".to_string(),
        tag_name: "body".to_string(),
        ..Default::default()
    }));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install CTRL+C signal handler")?;
    info!("Received shutdown signal, flushing...");

    let monitor_for_shutdown = monitor.clone();
    tokio::task::spawn_blocking(move || monitor_for_shutdown.destroy())
        .await
        .context("Shutdown task failed")?;

    info!("Reporter stats: {:?}", monitor.reporter().stats());
    info!("Final metrics:\n{}", metrics.render());
    Ok(())
}
