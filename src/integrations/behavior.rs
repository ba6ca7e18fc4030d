// src/integrations/behavior.rs
//! User behavior integration
//!
//! Emits `click`, `scroll`, `visibility_change`, `page_show`, `page_hide`
//! and `route_change` behavior records. Scroll reports are throttled to one
//! per second (leading edge). Programmatic navigation is observed by
//! wrapping the environment's navigator.

use crate::environment::{
    HostEvent, HostEventKind, NavigationCallback, NavigationChange, NavigationObserver,
};
use crate::integrations::{fields, ListenerSet};
use crate::pipeline::integration::{IntegrationContext, IntegrationHooks};
use crate::pipeline::monitor::{MonitorApi, MonitorHandle};
use crate::utils::errors::Result;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_CLICK_TEXT: usize = 100;
const SCROLL_THROTTLE: Duration = Duration::from_secs(1);

/// Leading-edge rate limiter
struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    fn ready(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

pub struct BehaviorIntegration {
    listeners: ListenerSet,
    navigation: Option<NavigationObserver>,
    scroll_throttle: Duration,
}

impl BehaviorIntegration {
    pub fn new() -> Self {
        Self {
            listeners: ListenerSet::default(),
            navigation: None,
            scroll_throttle: SCROLL_THROTTLE,
        }
    }

    /// Override the scroll reporting interval
    pub fn with_scroll_throttle(mut self, interval: Duration) -> Self {
        self.scroll_throttle = interval;
        self
    }
}

impl Default for BehaviorIntegration {
    fn default() -> Self {
        Self::new()
    }
}

fn scroll_percentage(scroll_top: f64, scroll_height: f64, client_height: f64) -> i64 {
    let scrollable = scroll_height - client_height;
    if scrollable <= 0.0 {
        return 0;
    }
    ((scroll_top / scrollable) * 100.0).round() as i64
}

fn route_change(monitor: &MonitorHandle, last_url: &Mutex<String>, kind: &str, to: &str) {
    let from = std::mem::replace(&mut *last_url.lock(), to.to_string());
    monitor.capture_behavior(
        "route_change",
        fields(json!({ "type": kind, "from": from, "to": to })),
    );
}

impl IntegrationHooks for BehaviorIntegration {
    fn name(&self) -> &str {
        "Behavior"
    }

    fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()> {
        let environment = ctx.environment();
        self.listeners.attach(environment.clone());
        let last_url = Arc::new(Mutex::new(environment.current_url()));

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::Click,
            Arc::new(move |event: &HostEvent| {
                let HostEvent::Click(click) = event else {
                    return;
                };
                let text: String = click.text.trim().chars().take(MAX_CLICK_TEXT).collect();
                monitor.capture_behavior(
                    "click",
                    fields(json!({
                        "target": click.target,
                        "xpath": click.xpath,
                        "text": text,
                        "tagName": click.tag_name.to_lowercase(),
                        "x": click.x,
                        "y": click.y,
                    })),
                );
            }),
        )?;

        let monitor = ctx.monitor();
        let throttle = Throttle::new(self.scroll_throttle);
        self.listeners.listen(
            HostEventKind::Scroll,
            Arc::new(move |event: &HostEvent| {
                let HostEvent::Scroll {
                    scroll_top,
                    scroll_height,
                    client_height,
                } = *event
                else {
                    return;
                };
                if !throttle.ready() {
                    return;
                }
                monitor.capture_behavior(
                    "scroll",
                    fields(json!({
                        "scrollTop": scroll_top,
                        "scrollHeight": scroll_height,
                        "clientHeight": client_height,
                        "scrollPercentage": scroll_percentage(scroll_top, scroll_height, client_height),
                    })),
                );
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::VisibilityChange,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::VisibilityChange { hidden } = *event {
                    let state = if hidden { "hidden" } else { "visible" };
                    monitor.capture_behavior(
                        "visibility_change",
                        fields(json!({ "hidden": hidden, "visibilityState": state })),
                    );
                }
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::PageShow,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::PageShow { persisted } = *event {
                    monitor.capture_behavior("page_show", fields(json!({ "persisted": persisted })));
                }
            }),
        )?;

        let monitor = ctx.monitor();
        self.listeners.listen(
            HostEventKind::PageHide,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::PageHide { persisted } = *event {
                    monitor.capture_behavior("page_hide", fields(json!({ "persisted": persisted })));
                }
            }),
        )?;

        let monitor = ctx.monitor();
        let hash_url = last_url.clone();
        self.listeners.listen(
            HostEventKind::HashChange,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::HashChange { old_url, new_url } = event {
                    *hash_url.lock() = new_url.clone();
                    monitor.capture_behavior(
                        "route_change",
                        fields(json!({ "type": "hash", "from": old_url, "to": new_url })),
                    );
                }
            }),
        )?;

        let monitor = ctx.monitor();
        let pop_url = last_url.clone();
        self.listeners.listen(
            HostEventKind::PopState,
            Arc::new(move |event: &HostEvent| {
                if let HostEvent::PopState { url } = event {
                    route_change(&monitor, &pop_url, "history", url);
                }
            }),
        )?;

        let monitor = ctx.monitor();
        let callback: NavigationCallback = Arc::new(move |change: &NavigationChange| {
            route_change(&monitor, &last_url, change.kind.route_type(), &change.url);
        });
        let observer = NavigationObserver::new(environment, callback);
        observer.install();
        self.navigation = Some(observer);

        Ok(())
    }

    fn uninstall(&mut self) {
        self.listeners.detach();
        if let Some(observer) = self.navigation.take() {
            observer.uninstall();
        }
    }
}
