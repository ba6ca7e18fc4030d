// src/integrations/mod.rs
//! Built-in integrations
//!
//! - **Errors**: runtime errors, unhandled rejections, resource load failures
//! - **Metrics**: vitals with ratings, navigation phases, resource timings
//! - **Behavior**: clicks, scrolling, visibility, page lifecycle, route changes
//!
//! Each one subscribes to host events through the `Environment` at setup and
//! removes every subscription on uninstall.

pub mod behavior;
pub mod errors;
pub mod metrics;

pub use behavior::BehaviorIntegration;
pub use errors::ErrorsIntegration;
pub use metrics::{rate_vital, resource_type, MetricsIntegration};

use crate::environment::{Environment, HostEventKind, Listener, ListenerId};
use crate::recording::record::Extra;
use crate::utils::errors::{MonitorError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Listener registrations owned by one integration
#[derive(Default)]
pub(crate) struct ListenerSet {
    environment: Option<Arc<dyn Environment>>,
    ids: Vec<ListenerId>,
}

impl ListenerSet {
    pub(crate) fn attach(&mut self, environment: Arc<dyn Environment>) {
        self.environment = Some(environment);
    }

    pub(crate) fn listen(&mut self, kind: HostEventKind, listener: Listener) -> Result<()> {
        let environment = self.environment.as_ref().ok_or_else(|| {
            MonitorError::IntegrationFailed(format!("{:?} listener added before attach", kind))
        })?;
        self.ids.push(environment.add_listener(kind, listener));
        Ok(())
    }

    /// Remove every registration; returns how many were removed
    pub(crate) fn detach(&mut self) -> usize {
        let Some(environment) = self.environment.take() else {
            return 0;
        };
        self.ids
            .drain(..)
            .filter(|id| environment.remove_listener(*id))
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Object literal to extra map
pub(crate) fn fields(value: Value) -> Extra {
    match value {
        Value::Object(map) => map,
        _ => Extra::new(),
    }
}
