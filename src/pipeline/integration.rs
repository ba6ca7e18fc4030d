// src/pipeline/integration.rs
//! Integration protocol
//!
//! An integration is set up exactly once, synchronously, when it is added to
//! a monitor. Setup receives an `IntegrationContext` through which it can
//! register record observers, reach the monitor's capture surface, and
//! subscribe to the host environment. `uninstall` must undo every side
//! effect of setup, including a setup that only got part of the way.

use crate::environment::Environment;
use crate::integrations::{BehaviorIntegration, ErrorsIntegration, MetricsIntegration};
use crate::observability::Diagnostics;
use crate::pipeline::monitor::MonitorHandle;
use crate::recording::record::Record;
use crate::utils::config::MonitorConfig;
use crate::utils::errors::Result;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every accepted record
///
/// Errors and panics are contained by the pipeline.
pub type Observer = Arc<dyn Fn(&Record) -> Result<()> + Send + Sync>;

/// Behaviour shared by every integration
pub trait IntegrationHooks: Send {
    fn name(&self) -> &str;

    /// Attach to the monitor and environment
    fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()>;

    /// Detach everything `setup_once` attached; safe to call repeatedly
    fn uninstall(&mut self) {}
}

/// Legacy extension point
pub trait Plugin: Send {
    fn name(&self) -> &str;

    fn install(&mut self, monitor: MonitorHandle);

    fn uninstall(&mut self) {}
}

/// What an integration gets to work with during setup
pub struct IntegrationContext {
    monitor: MonitorHandle,
    environment: Arc<dyn Environment>,
    diagnostics: Diagnostics,
}

impl IntegrationContext {
    pub(crate) fn new(
        monitor: MonitorHandle,
        environment: Arc<dyn Environment>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            monitor,
            environment,
            diagnostics,
        }
    }

    /// Register an observer of accepted records
    ///
    /// Takes effect immediately, so records captured later in the same
    /// setup already reach it.
    pub fn add_callback(&mut self, observer: Observer) {
        self.monitor.add_callback(observer);
    }

    /// Capture surface of the owning monitor
    pub fn monitor(&self) -> MonitorHandle {
        self.monitor.clone()
    }

    pub fn environment(&self) -> Arc<dyn Environment> {
        self.environment.clone()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Registered integration
///
/// The built-in variants are gated by their feature toggle; `Custom` is
/// always set up.
pub enum Integration {
    Errors(ErrorsIntegration),
    Metrics(MetricsIntegration),
    Behavior(BehaviorIntegration),
    Custom(Box<dyn IntegrationHooks>),
}

impl Integration {
    pub fn errors() -> Self {
        Integration::Errors(ErrorsIntegration::new())
    }

    pub fn metrics() -> Self {
        Integration::Metrics(MetricsIntegration::new())
    }

    pub fn behavior() -> Self {
        Integration::Behavior(BehaviorIntegration::new())
    }

    pub fn custom(hooks: impl IntegrationHooks + 'static) -> Self {
        Integration::Custom(Box::new(hooks))
    }

    /// The three built-ins, in their usual order
    pub fn defaults() -> Vec<Integration> {
        vec![Self::errors(), Self::metrics(), Self::behavior()]
    }

    /// Whether the configuration allows this integration to be set up
    pub fn is_enabled(&self, config: &MonitorConfig) -> bool {
        match self {
            Integration::Errors(_) => config.enable_error,
            Integration::Metrics(_) => config.enable_performance,
            Integration::Behavior(_) => config.enable_behavior,
            Integration::Custom(_) => true,
        }
    }

    fn hooks(&self) -> &dyn IntegrationHooks {
        match self {
            Integration::Errors(i) => i,
            Integration::Metrics(i) => i,
            Integration::Behavior(i) => i,
            Integration::Custom(i) => i.as_ref(),
        }
    }

    fn hooks_mut(&mut self) -> &mut dyn IntegrationHooks {
        match self {
            Integration::Errors(i) => i,
            Integration::Metrics(i) => i,
            Integration::Behavior(i) => i,
            Integration::Custom(i) => i.as_mut(),
        }
    }

    pub fn name(&self) -> &str {
        self.hooks().name()
    }

    pub fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()> {
        self.hooks_mut().setup_once(ctx)
    }

    pub fn uninstall(&mut self) {
        self.hooks_mut().uninstall()
    }
}

impl fmt::Debug for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Integration").field(&self.name()).finish()
    }
}
