// src/integrations/metrics.rs
//! Performance metrics integration
//!
//! Vitals are reported once per metric name with a rating. Navigation timing
//! is broken into `navigation.<phase>` measurements, and each resource load
//! becomes a `resource.<type>` measurement.

use crate::environment::{HostEvent, HostEventKind};
use crate::integrations::{fields, ListenerSet};
use crate::pipeline::integration::{IntegrationContext, IntegrationHooks};
use crate::pipeline::monitor::MonitorApi;
use crate::recording::record::{MetricCategory, Rating};
use crate::utils::errors::Result;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// (good, needs-improvement) upper bounds, inclusive
const THRESHOLDS: &[(&str, f64, f64)] = &[
    ("CLS", 0.1, 0.25),
    ("FID", 100.0, 300.0),
    ("LCP", 2500.0, 4000.0),
    ("FCP", 1800.0, 3000.0),
    ("TTFB", 800.0, 1800.0),
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "ico"];
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];
const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "less"];
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

/// Rate a vital against its thresholds; unknown names rate good
pub fn rate_vital(name: &str, value: f64) -> Rating {
    match THRESHOLDS.iter().find(|(n, _, _)| *n == name) {
        Some((_, good, _)) if value <= *good => Rating::Good,
        Some((_, _, needs_improvement)) if value <= *needs_improvement => {
            Rating::NeedsImprovement
        }
        Some(_) => Rating::Poor,
        None => Rating::Good,
    }
}

/// Classify a resource URL by its file extension
pub fn resource_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let extension = match path.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return "other",
    };

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        "image"
    } else if SCRIPT_EXTENSIONS.contains(&extension.as_str()) {
        "script"
    } else if STYLE_EXTENSIONS.contains(&extension.as_str()) {
        "style"
    } else if FONT_EXTENSIONS.contains(&extension.as_str()) {
        "font"
    } else {
        "other"
    }
}

#[derive(Default)]
pub struct MetricsIntegration {
    listeners: ListenerSet,
    reported: Arc<Mutex<HashSet<String>>>,
}

impl MetricsIntegration {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegrationHooks for MetricsIntegration {
    fn name(&self) -> &str {
        "Metrics"
    }

    fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()> {
        self.listeners.attach(ctx.environment());

        let monitor = ctx.monitor();
        let reported = self.reported.clone();
        self.listeners.listen(
            HostEventKind::Vital,
            Arc::new(move |event: &HostEvent| {
                let HostEvent::Vital(metric) = event else {
                    return;
                };
                if !reported.lock().insert(metric.name.clone()) {
                    return;
                }

                let mut extra = fields(json!({
                    "rating": rate_vital(&metric.name, metric.value),
                    "metricType": MetricCategory::WebVitals,
                }));
                if let Some(navigation_type) = &metric.navigation_type {
                    extra.insert("navigationType".into(), json!(navigation_type));
                }
                monitor.capture_performance(&metric.name, metric.value, Some(extra));
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::NavigationTiming,
            Arc::new(move |event: &HostEvent| {
                let HostEvent::NavigationTiming(timing) = event else {
                    return;
                };
                for (phase, value) in timing.phases() {
                    if value <= 0.0 {
                        continue;
                    }
                    let mut extra = fields(json!({ "metricType": MetricCategory::Navigation }));
                    if let Some(navigation_type) = &timing.navigation_type {
                        extra.insert("navigationType".into(), json!(navigation_type));
                    }
                    monitor.capture_performance(&format!("navigation.{}", phase), value, Some(extra));
                }
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::ResourceTiming,
            Arc::new(move |event: &HostEvent| {
                let HostEvent::ResourceTiming(timing) = event else {
                    return;
                };
                if timing.duration <= 0.0 {
                    return;
                }
                monitor.capture_performance(
                    &format!("resource.{}", resource_type(&timing.url)),
                    timing.duration,
                    Some(fields(json!({
                        "metricType": MetricCategory::Resource,
                        "url": timing.url,
                        "transferSize": timing.transfer_size,
                        "decodedBodySize": timing.decoded_body_size,
                        "encodedBodySize": timing.encoded_body_size,
                    }))),
                );
            }),
        )?;

        Ok(())
    }

    fn uninstall(&mut self) {
        self.listeners.detach();
        self.reported.lock().clear();
    }
}
