// src/integrations/errors.rs
//! Error capture integration

use crate::environment::{HostEvent, HostEventKind};
use crate::integrations::{fields, ListenerSet};
use crate::pipeline::integration::{IntegrationContext, IntegrationHooks};
use crate::pipeline::monitor::{MonitorApi, MonitorHandle};
use crate::recording::record::{CapturedError, ErrorKind, Extra};
use crate::utils::errors::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Reports uncaught errors, unhandled rejections and failed resource loads
#[derive(Default)]
pub struct ErrorsIntegration {
    listeners: ListenerSet,
}

impl ErrorsIntegration {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegrationHooks for ErrorsIntegration {
    fn name(&self) -> &str {
        "Errors"
    }

    fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()> {
        self.listeners.attach(ctx.environment());

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::Error,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::Error {
                    message,
                    filename,
                    lineno,
                    colno,
                    stack,
                } = event
                {
                    capture_runtime_error(&monitor, message, filename, *lineno, *colno, stack);
                }
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::UnhandledRejection,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::UnhandledRejection { reason, stack } = event {
                    let mut error =
                        CapturedError::new(format!("Unhandled Promise Rejection: {}", reason))
                            .with_kind(ErrorKind::Rejection);
                    if let Some(stack) = stack {
                        error = error.with_stack(stack.clone());
                    }
                    monitor.capture_error(error, None);
                }
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::ResourceError,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::ResourceError { tag, src } = event {
                    let error = CapturedError::new(format!(
                        "Failed to load {}: {}",
                        tag.to_lowercase(),
                        src
                    ))
                    .with_kind(ErrorKind::Resource);
                    monitor.capture_error(error, Some(fields(json!({ "filename": src }))));
                }
            }),
        )?;

        debug!("Errors integration listening ({} listeners)", self.listeners.len());
        Ok(())
    }

    fn uninstall(&mut self) {
        self.listeners.detach();
    }
}

fn capture_runtime_error(
    monitor: &MonitorHandle,
    message: &str,
    filename: &Option<String>,
    lineno: Option<u32>,
    colno: Option<u32>,
    stack: &Option<String>,
) {
    let mut error = CapturedError::new(message).with_kind(ErrorKind::Runtime);
    if let Some(stack) = stack {
        error = error.with_stack(stack.clone());
    }

    let mut extra = Extra::new();
    if let Some(filename) = filename {
        extra.insert("filename".into(), json!(filename));
    }
    if let Some(lineno) = lineno {
        extra.insert("lineno".into(), json!(lineno));
    }
    if let Some(colno) = colno {
        extra.insert("colno".into(), json!(colno));
    }

    monitor.capture_error(error, Some(extra));
}
