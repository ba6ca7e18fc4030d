// src/pipeline/monitor.rs
//! The monitor: capture API, report pipeline and lifecycle
//!
//! A `Monitor` is a cheap handle over shared state. Integrations and plugins
//! receive a `MonitorHandle` instead, a weak reference that turns every call
//! into a no-op once the monitor is gone, so nothing they hold keeps the
//! monitor alive.

use crate::environment::{Environment, NullEnvironment};
use crate::observability::{
    DiagnosticSink, Diagnostics, TracingSink, OBSERVER_FAILURES, RECORDS_CAPTURED,
    RECORDS_SAMPLED_OUT,
};
use crate::pipeline::integration::{Integration, IntegrationContext, Observer, Plugin};
use crate::recording::record::{
    BaseData, BehaviorRecord, CapturedError, ErrorRecord, Extra, PerformanceRecord, Record,
};
use crate::recording::sampler::Sampler;
use crate::reporter::{Reporter, ReporterConfig, TransportDispatcher, Transports};
use crate::utils::clock::{new_session_id, MonotonicClock};
use crate::utils::config::{MonitorConfig, MonitorOptions};
use crate::utils::errors::MonitorError;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Capture surface shared by `Monitor` and `MonitorHandle`
pub trait MonitorApi {
    /// Install a legacy plugin
    fn use_plugin(&self, plugin: Box<dyn Plugin>);

    /// Record a custom behavior event
    fn track(&self, event_name: &str, data: Extra);

    fn capture_error(&self, error: CapturedError, extra: Option<Extra>);

    fn capture_performance(&self, name: &str, value: f64, extra: Option<Extra>);

    fn capture_behavior(&self, event_name: &str, data: Extra);

    /// Uninstall everything, flush, and stop reporting
    fn destroy(&self);
}

struct MonitorInner {
    config: MonitorConfig,
    session_id: String,
    clock: MonotonicClock,
    sampler: Sampler,
    environment: Arc<dyn Environment>,
    diagnostics: Diagnostics,
    reporter: Arc<Reporter>,
    callbacks: RwLock<Vec<Observer>>,
    integrations: Mutex<Vec<Integration>>,
    plugins: Mutex<Vec<Box<dyn Plugin>>>,
    destroyed: AtomicBool,
    this: Weak<MonitorInner>,
}

/// Telemetry monitor
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

/// Non-owning reference to a monitor
#[derive(Clone, Default)]
pub struct MonitorHandle {
    inner: Weak<MonitorInner>,
}

/// Builder for a `Monitor`
pub struct MonitorBuilder {
    options: MonitorOptions,
    environment: Option<Arc<dyn Environment>>,
    transports: Option<Transports>,
    sink: Arc<dyn DiagnosticSink>,
    sampler_seed: Option<u64>,
}

impl MonitorBuilder {
    /// Host environment (defaults to `NullEnvironment`)
    pub fn environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Delivery strategies (defaults to the HTTP transports)
    pub fn transports(mut self, transports: Transports) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Destination for debug diagnostics (defaults to `tracing`)
    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Deterministic sampling
    pub fn sampler_seed(mut self, seed: u64) -> Self {
        self.sampler_seed = Some(seed);
        self
    }

    pub fn build(self) -> Monitor {
        let diagnostics = Diagnostics::new(self.options.debug.unwrap_or(false), self.sink);
        let (config, integrations) = MonitorConfig::resolve(self.options, &diagnostics);

        let transports = self.transports.unwrap_or_else(|| {
            Transports::http(
                config.request_timeout,
                config.blocking_request,
                diagnostics.clone(),
            )
        });
        let dispatcher = TransportDispatcher::new(
            config.transport,
            config.connection_string.clone(),
            transports,
            diagnostics.clone(),
        );
        let reporter = Reporter::new(
            ReporterConfig {
                max_queue_size: config.max_queue_size,
                flush_interval: config.flush_interval,
            },
            dispatcher,
            diagnostics.clone(),
        );
        reporter.start_timer();

        let sampler = match self.sampler_seed {
            Some(seed) => Sampler::with_seed(config.sampling_rate, seed),
            None => Sampler::new(config.sampling_rate),
        };
        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(NullEnvironment::new()));

        let session_id = new_session_id();
        info!(
            "Monitor initialized (app_id={:?}, session={}, transport={})",
            config.application_id, session_id, config.transport
        );
        diagnostics.info(format_args!("initialized with config: {:?}", config));

        let inner = Arc::new_cyclic(|this| MonitorInner {
            config,
            session_id,
            clock: MonotonicClock::new(),
            sampler,
            environment,
            diagnostics,
            reporter,
            callbacks: RwLock::new(Vec::new()),
            integrations: Mutex::new(Vec::new()),
            plugins: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            this: this.clone(),
        });

        let monitor = Monitor { inner };
        for integration in integrations {
            monitor.add_integration(integration);
        }
        monitor
    }
}

impl Monitor {
    /// Monitor with the default environment, transports and diagnostics
    pub fn new(options: MonitorOptions) -> Self {
        Self::builder(options).build()
    }

    pub fn builder(options: MonitorOptions) -> MonitorBuilder {
        MonitorBuilder {
            options,
            environment: None,
            transports: None,
            sink: Arc::new(TracingSink),
            sampler_seed: None,
        }
    }

    /// Register and set up an integration
    pub fn add_integration(&self, integration: Integration) {
        self.inner.add_integration(integration);
    }

    /// Register an observer of accepted records
    pub fn add_callback(&self, observer: Observer) {
        self.inner.add_callback(observer);
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.inner.reporter
    }

    pub fn environment(&self) -> &Arc<dyn Environment> {
        &self.inner.environment
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Names of the integrations currently installed
    pub fn integration_names(&self) -> Vec<String> {
        self.inner
            .integrations
            .lock()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    pub fn callback_count(&self) -> usize {
        self.inner.callbacks.read().len()
    }
}

impl MonitorApi for Monitor {
    fn use_plugin(&self, plugin: Box<dyn Plugin>) {
        self.inner.use_plugin(plugin);
    }

    fn track(&self, event_name: &str, data: Extra) {
        self.inner.track(event_name, data);
    }

    fn capture_error(&self, error: CapturedError, extra: Option<Extra>) {
        self.inner.capture_error(error, extra);
    }

    fn capture_performance(&self, name: &str, value: f64, extra: Option<Extra>) {
        self.inner.capture_performance(name, value, extra);
    }

    fn capture_behavior(&self, event_name: &str, data: Extra) {
        self.inner.capture_behavior(event_name, data);
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("session_id", &self.inner.session_id)
            .field("config", &self.inner.config)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl MonitorHandle {
    /// False once the monitor has been dropped
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn upgrade(&self) -> Option<Monitor> {
        self.inner.upgrade().map(|inner| Monitor { inner })
    }

    pub(crate) fn add_callback(&self, observer: Observer) {
        self.with(|m| m.add_callback(observer));
    }

    fn with<F: FnOnce(&MonitorInner)>(&self, f: F) {
        if let Some(inner) = self.inner.upgrade() {
            f(&inner);
        }
    }
}

impl MonitorApi for MonitorHandle {
    fn use_plugin(&self, plugin: Box<dyn Plugin>) {
        self.with(|m| m.use_plugin(plugin));
    }

    fn track(&self, event_name: &str, data: Extra) {
        self.with(|m| m.track(event_name, data));
    }

    fn capture_error(&self, error: CapturedError, extra: Option<Extra>) {
        self.with(|m| m.capture_error(error, extra));
    }

    fn capture_performance(&self, name: &str, value: f64, extra: Option<Extra>) {
        self.with(|m| m.capture_performance(name, value, extra));
    }

    fn capture_behavior(&self, event_name: &str, data: Extra) {
        self.with(|m| m.capture_behavior(event_name, data));
    }

    fn destroy(&self) {
        self.with(|m| m.destroy());
    }
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl MonitorInner {
    fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            inner: self.this.clone(),
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn add_integration(&self, mut integration: Integration) {
        if self.is_destroyed() {
            warn!("Integration {} added after destroy; ignored", integration.name());
            self.diagnostics.warn(format_args!(
                "integration \"{}\" ignored: monitor destroyed",
                integration.name()
            ));
            return;
        }

        if !integration.is_enabled(&self.config) {
            debug!("Integration {} disabled by config", integration.name());
            return;
        }

        let mut ctx = IntegrationContext::new(
            self.handle(),
            self.environment.clone(),
            self.diagnostics.clone(),
        );
        if let Err(e) = integration.setup_once(&mut ctx) {
            warn!("Integration {} setup failed: {}", integration.name(), e);
            self.diagnostics.error(format_args!(
                "integration \"{}\" setup failed: {}",
                integration.name(),
                e
            ));
        }

        let mut integrations = self.integrations.lock();
        if self.is_destroyed() {
            drop(integrations);
            integration.uninstall();
            return;
        }
        debug!("Integration {} added", integration.name());
        self.diagnostics
            .info(format_args!("integration \"{}\" added", integration.name()));
        integrations.push(integration);
    }

    fn add_callback(&self, observer: Observer) {
        if self.is_destroyed() {
            return;
        }
        self.callbacks.write().push(observer);
    }

    fn use_plugin(&self, mut plugin: Box<dyn Plugin>) {
        if self.is_destroyed() {
            self.diagnostics.warn(format_args!(
                "plugin \"{}\" ignored: monitor destroyed",
                plugin.name()
            ));
            return;
        }

        plugin.install(self.handle());

        let mut plugins = self.plugins.lock();
        if self.is_destroyed() {
            drop(plugins);
            plugin.uninstall();
            return;
        }
        self.diagnostics
            .info(format_args!("plugin \"{}\" installed", plugin.name()));
        plugins.push(plugin);
    }

    fn track(&self, event_name: &str, data: Extra) {
        debug!("Track event {}", event_name);
        self.capture_behavior(event_name, data);
    }

    fn capture_error(&self, error: CapturedError, extra: Option<Extra>) {
        if self.is_destroyed() {
            return;
        }
        let mut record = ErrorRecord::new(self.base_data(), error);
        if let Some(extra) = extra {
            record.absorb(extra);
        }
        self.report(Record::Error(record));
    }

    fn capture_performance(&self, name: &str, value: f64, extra: Option<Extra>) {
        if self.is_destroyed() {
            return;
        }
        let mut record = PerformanceRecord::new(self.base_data(), name, value);
        if let Some(extra) = extra {
            record.absorb(extra);
        }
        self.report(Record::Performance(record));
    }

    fn capture_behavior(&self, event_name: &str, data: Extra) {
        if self.is_destroyed() {
            return;
        }
        let record = BehaviorRecord::new(self.base_data(), event_name, data);
        self.report(Record::Behavior(record));
    }

    fn base_data(&self) -> BaseData {
        BaseData {
            app_id: self.config.application_id.clone(),
            timestamp: self.clock.now_millis(),
            source_url: self.environment.current_url(),
            client_agent: self.environment.client_agent(),
            session_id: self.session_id.clone(),
        }
    }

    fn report(&self, record: Record) {
        if !self.sampler.is_sampled() {
            metrics::counter!(RECORDS_SAMPLED_OUT).increment(1);
            return;
        }

        let observers = self.callbacks.read().clone();
        for observer in &observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer(&record)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => MonitorError::ObserverFailed(e.to_string()),
                Err(panic) => MonitorError::ObserverFailed(panic_message(panic.as_ref())),
            };
            metrics::counter!(OBSERVER_FAILURES).increment(1);
            debug!("{}", failure);
            self.diagnostics.error(format_args!("callback error: {}", failure));
        }

        debug!("Reporting {} record", record.kind());
        if self.diagnostics.is_enabled() {
            if let Ok(json) = serde_json::to_string(&record) {
                self.diagnostics.info(format_args!("report data: {}", json));
            }
        }

        metrics::counter!(RECORDS_CAPTURED, "type" => record.kind()).increment(1);
        self.reporter.add(record);
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let plugins = std::mem::take(&mut *self.plugins.lock());
        for mut plugin in plugins {
            debug!("Uninstalling plugin {}", plugin.name());
            plugin.uninstall();
        }

        let integrations = std::mem::take(&mut *self.integrations.lock());
        for mut integration in integrations {
            debug!("Uninstalling integration {}", integration.name());
            integration.uninstall();
        }

        self.callbacks.write().clear();
        self.reporter.destroy();

        info!("Monitor destroyed (session={})", self.session_id);
        self.diagnostics.info("destroyed");
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "observer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::HostEnvironment;
    use crate::observability::{DiagnosticLevel, MemorySink};
    use crate::pipeline::integration::IntegrationHooks;
    use crate::reporter::transport::test_support::RecordingTransport;
    use crate::utils::errors::Result;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    const CONNECTION: &str = "https://host/api/v1/monitoring/abc123";

    fn extra(value: serde_json::Value) -> Extra {
        value.as_object().cloned().unwrap()
    }

    fn options() -> MonitorOptions {
        MonitorOptions {
            max_queue_size: Some(100),
            flush_interval_ms: Some(100_000),
            ..MonitorOptions::new(CONNECTION)
        }
    }

    fn build(options: MonitorOptions) -> (Monitor, Arc<RecordingTransport>) {
        let transport = RecordingTransport::new("recording");
        let monitor = Monitor::builder(options)
            .environment(Arc::new(HostEnvironment::new("https://app/home", "test-agent")))
            .transports(Transports::uniform(transport.clone()))
            .sampler_seed(7)
            .build();
        (monitor, transport)
    }

    fn collect(monitor: &Monitor) -> Arc<Mutex<Vec<Record>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        monitor.add_callback(Arc::new(move |record: &Record| {
            sink.lock().push(record.clone());
            Ok(())
        }));
        seen
    }

    #[derive(Default)]
    struct Counters {
        setups: AtomicUsize,
        uninstalls: AtomicUsize,
    }

    struct CountingIntegration(Arc<Counters>);

    impl IntegrationHooks for CountingIntegration {
        fn name(&self) -> &str {
            "Counting"
        }

        fn setup_once(&mut self, _ctx: &mut IntegrationContext) -> Result<()> {
            self.0.setups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn uninstall(&mut self) {
            self.0.uninstalls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_capture_error_record() {
        let (monitor, _transport) = build(options());
        let seen = collect(&monitor);

        monitor.capture_error("boom".into(), None);

        let seen = seen.lock();
        let json = serde_json::to_value(&seen[0]).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["appId"], "abc123");
        assert_eq!(json["sessionId"], monitor.session_id());
        assert_eq!(json["sourceUrl"], "https://app/home");
        assert_eq!(json["clientAgent"], "test-agent");
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_error_with_source_chain_has_stack() {
        let (monitor, _transport) = build(options());
        let seen = collect(&monitor);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let error = anyhow::Error::new(io).context("save failed");
        monitor.capture_error(CapturedError::from(&error), Some(extra(json!({"lineno": 3}))));

        let seen = seen.lock();
        match &seen[0] {
            Record::Error(record) => {
                assert_eq!(record.message, "save failed");
                assert!(record.stack.as_deref().unwrap().contains("disk gone"));
                assert_eq!(record.lineno, Some(3));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_session_id_stable_within_instance() {
        let (a, _) = build(options());
        let (b, _) = build(options());
        let seen = collect(&a);

        a.track("one", Extra::new());
        a.capture_performance("LCP", 1200.0, None);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.base().session_id == a.session_id()));
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let (monitor, _transport) = build(options());
        let seen = collect(&monitor);
        for i in 0..50 {
            monitor.capture_behavior("tick", extra(json!({ "i": i })));
        }
        let stamps: Vec<i64> = seen.lock().iter().map(|r| r.base().timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_failing_observers_do_not_stop_others() {
        let sink = Arc::new(MemorySink::default());
        let transport = RecordingTransport::new("recording");
        let monitor = Monitor::builder(MonitorOptions {
            debug: Some(true),
            ..options()
        })
        .transports(Transports::uniform(transport.clone()))
        .diagnostic_sink(sink.clone())
        .build();

        monitor.add_callback(Arc::new(|_: &Record| -> Result<()> {
            Err(MonitorError::ObserverFailed("always".into()))
        }));
        monitor.add_callback(Arc::new(|_: &Record| -> Result<()> { panic!("observer blew up") }));
        let seen = collect(&monitor);

        for _ in 0..3 {
            monitor.track("click", Extra::new());
        }

        assert_eq!(seen.lock().len(), 3);
        let errors: Vec<String> = sink
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("callback error"))
            .collect();
        assert_eq!(errors.len(), 6);
        assert!(errors.iter().any(|l| l.contains("observer blew up")));

        monitor.reporter().flush();
        assert_eq!(transport.batches()[0].len(), 3);
    }

    #[test]
    fn test_size_threshold_through_monitor() {
        let (monitor, transport) = build(MonitorOptions {
            max_queue_size: Some(2),
            ..options()
        });

        monitor.capture_behavior("click", extra(json!({"x": 1})));
        monitor.capture_behavior("click", extra(json!({"x": 1})));

        assert_eq!(transport.sends(), 1);
        let batch = &transport.batches()[0];
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["eventName"], "click");
        assert_eq!(batch[0]["data"]["x"], 1);
        assert_eq!(monitor.reporter().queue_len(), 0);
    }

    #[test]
    fn test_sampling_rate_respected() {
        let (monitor, _transport) = build(MonitorOptions {
            sampling_rate: Some(0.25),
            max_queue_size: Some(1000),
            ..options()
        });
        let seen = collect(&monitor);

        let n = 4000;
        for _ in 0..n {
            monitor.track("t", Extra::new());
        }

        let accepted = seen.lock().len() as f64;
        let expected = n as f64 * 0.25;
        let sigma = (n as f64 * 0.25 * 0.75).sqrt();
        assert!((accepted - expected).abs() < 5.0 * sigma, "accepted {}", accepted);
    }

    #[test]
    fn test_zero_sampling_drops_everything() {
        let (monitor, transport) = build(MonitorOptions {
            sampling_rate: Some(0.0),
            ..options()
        });
        let seen = collect(&monitor);
        monitor.capture_error("x".into(), None);
        monitor.destroy();
        assert!(seen.lock().is_empty());
        assert_eq!(transport.sends(), 0);
    }

    #[test]
    fn test_destroy_uninstalls_once_and_flushes() {
        let counters = Arc::new(Counters::default());
        let (monitor, transport) = build(options());
        monitor.add_integration(Integration::custom(CountingIntegration(counters.clone())));
        assert_eq!(counters.setups.load(Ordering::SeqCst), 1);

        monitor.track("pending", Extra::new());
        monitor.destroy();
        monitor.destroy();

        assert_eq!(counters.uninstalls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.sends(), 1);
        assert_eq!(monitor.reporter().queue_len(), 0);
        assert!(monitor.integration_names().is_empty());
        assert_eq!(monitor.callback_count(), 0);
    }

    #[test]
    fn test_capture_after_destroy_is_noop() {
        let counters = Arc::new(Counters::default());
        let (monitor, transport) = build(options());
        monitor.destroy();

        monitor.capture_error("late".into(), None);
        monitor.track("late", Extra::new());
        monitor.add_integration(Integration::custom(CountingIntegration(counters.clone())));
        monitor.reporter().flush();

        assert_eq!(transport.sends(), 0);
        assert_eq!(counters.setups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_builtin_not_set_up() {
        let env = Arc::new(HostEnvironment::new("https://app/", "agent"));
        let monitor = Monitor::builder(MonitorOptions {
            enable_error: Some(false),
            ..options()
        }
        .with_integration(Integration::errors())
        .with_integration(Integration::behavior()))
        .environment(env.clone())
        .transports(Transports::uniform(RecordingTransport::new("recording")))
        .build();

        assert_eq!(monitor.integration_names(), vec!["Behavior".to_string()]);
        assert_eq!(env.listener_count_for(crate::environment::HostEventKind::Error), 0);
    }

    #[test]
    fn test_invalid_connection_string_logged_in_debug() {
        let sink = Arc::new(MemorySink::default());
        let monitor = Monitor::builder(MonitorOptions {
            debug: Some(true),
            ..MonitorOptions::new("not a url")
        })
        .transports(Transports::uniform(RecordingTransport::new("recording")))
        .diagnostic_sink(sink.clone())
        .build();

        assert_eq!(monitor.config().application_id, "");
        assert!(sink.count(DiagnosticLevel::Warn) >= 1);
    }

    struct CapturingPlugin {
        installed: Arc<AtomicUsize>,
        uninstalled: Arc<AtomicUsize>,
    }

    impl Plugin for CapturingPlugin {
        fn name(&self) -> &str {
            "capturing"
        }

        fn install(&mut self, monitor: MonitorHandle) {
            self.installed.fetch_add(1, Ordering::SeqCst);
            monitor.track("plugin_installed", Extra::new());
        }

        fn uninstall(&mut self) {
            self.uninstalled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_plugin_lifecycle() {
        let (monitor, transport) = build(options());
        let installed = Arc::new(AtomicUsize::new(0));
        let uninstalled = Arc::new(AtomicUsize::new(0));

        monitor.use_plugin(Box::new(CapturingPlugin {
            installed: installed.clone(),
            uninstalled: uninstalled.clone(),
        }));
        assert_eq!(installed.load(Ordering::SeqCst), 1);

        monitor.destroy();
        assert_eq!(uninstalled.load(Ordering::SeqCst), 1);
        assert_eq!(transport.batches()[0][0]["eventName"], "plugin_installed");
    }

    #[test]
    fn test_handle_is_weak() {
        let (monitor, transport) = build(options());
        let handle = monitor.handle();
        assert!(handle.is_alive());

        handle.track("via_handle", Extra::new());
        drop(monitor);

        assert!(!handle.is_alive());
        handle.track("after_drop", Extra::new());
        let batches = transport.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0]["eventName"], "via_handle");
    }

    #[test]
    fn test_integration_observer_registered_through_context() {
        struct Observing(Arc<AtomicUsize>);

        impl IntegrationHooks for Observing {
            fn name(&self) -> &str {
                "Observing"
            }

            fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()> {
                let hits = self.0.clone();
                ctx.add_callback(Arc::new(move |_: &Record| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }));
                Ok(())
            }
        }

        let hits = Arc::new(AtomicUsize::new(0));
        let (monitor, _transport) = build(options());
        monitor.add_integration(Integration::custom(Observing(hits.clone())));

        monitor.track("a", Extra::new());
        monitor.track("b", Extra::new());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_integration_observer_sees_records_from_its_own_setup() {
        struct AnnounceOnSetup(Arc<Mutex<Vec<String>>>);

        impl IntegrationHooks for AnnounceOnSetup {
            fn name(&self) -> &str {
                "AnnounceOnSetup"
            }

            fn setup_once(&mut self, ctx: &mut IntegrationContext) -> Result<()> {
                let names = self.0.clone();
                ctx.add_callback(Arc::new(move |record: &Record| {
                    if let Record::Behavior(behavior) = record {
                        names.lock().push(behavior.event_name.clone());
                    }
                    Ok(())
                }));
                ctx.monitor().track("integration_ready", Extra::new());
                Ok(())
            }
        }

        let names = Arc::new(Mutex::new(Vec::new()));
        let (monitor, _transport) = build(options());
        monitor.add_integration(Integration::custom(AnnounceOnSetup(names.clone())));
        monitor.track("after", Extra::new());

        assert_eq!(*names.lock(), vec!["integration_ready", "after"]);
    }

    #[test]
    fn test_timer_flushes_outside_async_runtime() {
        let (monitor, transport) = build(MonitorOptions {
            flush_interval_ms: Some(50),
            ..options()
        });
        assert!(monitor.reporter().timer_active());

        monitor.track("idle", Extra::new());
        std::thread::sleep(std::time::Duration::from_millis(400));

        assert_eq!(transport.sends(), 1);
        assert_eq!(transport.batches()[0][0]["eventName"], "idle");
        assert_eq!(monitor.reporter().queue_len(), 0);
    }
}
