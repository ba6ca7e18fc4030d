// src/observability/diagnostics.rs
//! Debug-gated diagnostics channel
//!
//! Pipeline code reports recoverable problems (bad connection string, failing
//! observer, dropped batch) through `Diagnostics`. Nothing is emitted unless
//! the monitor was configured with `debug`, and the destination is an
//! injectable `DiagnosticSink` so the pipeline never assumes a console.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Severity of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

/// Destination for diagnostic lines
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, level: DiagnosticLevel, message: &str);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, level: DiagnosticLevel, message: &str) {
        match level {
            DiagnosticLevel::Info => tracing::info!(target: "sentra_monitor", "{}", message),
            DiagnosticLevel::Warn => tracing::warn!(target: "sentra_monitor", "{}", message),
            DiagnosticLevel::Error => tracing::error!(target: "sentra_monitor", "{}", message),
        }
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(DiagnosticLevel, String)>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, line)| line.clone()).collect()
    }

    pub fn count(&self, level: DiagnosticLevel) -> usize {
        self.lines.lock().iter().filter(|(l, _)| *l == level).count()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, level: DiagnosticLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

/// Cheap-to-clone handle combining the debug flag and a sink
#[derive(Clone)]
pub struct Diagnostics {
    enabled: bool,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub fn new(enabled: bool, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { enabled, sink }
    }

    /// Diagnostics that never emit
    pub fn disabled() -> Self {
        Self::new(false, Arc::new(TracingSink))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(DiagnosticLevel::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.emit(DiagnosticLevel::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.emit(DiagnosticLevel::Error, message);
    }

    fn emit(&self, level: DiagnosticLevel, message: impl fmt::Display) {
        if self.enabled {
            self.sink.emit(level, &message.to_string());
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .finish()
    }
}
