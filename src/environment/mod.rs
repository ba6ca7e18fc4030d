// src/environment/mod.rs
//! Host environment capability
//!
//! Integrations never reach for ambient globals. Everything they observe
//! (the current URL, the client agent string, host events, the navigation
//! primitive) comes through an `Environment` handed to them at setup.
//!
//! ```text
//!          ┌──────────────────────┐
//!          │     Environment      │
//!          │ current_url()        │
//!          │ client_agent()       │
//!          │ add_listener(kind)   │◀── integrations subscribe
//!          │ remove_listener(id)  │
//!          │ navigator()          │◀── NavigationObserver wraps/restores
//!          └──────────┬───────────┘
//!             ┌───────┴────────┐
//!             ▼                ▼
//!      HostEnvironment   NullEnvironment
//! ```

pub mod host;
pub mod navigation;

pub use host::HostEnvironment;
pub use navigation::{NavigationCallback, NavigationChange, NavigationKind, NavigationObserver};

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by `add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        ListenerId(counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// Host event callback
pub type Listener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Kinds of host events a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    Error,
    UnhandledRejection,
    ResourceError,
    Click,
    Scroll,
    VisibilityChange,
    PageShow,
    PageHide,
    HashChange,
    PopState,
    Vital,
    NavigationTiming,
    ResourceTiming,
}

/// Event raised by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Uncaught runtime error
    Error {
        message: String,
        filename: Option<String>,
        lineno: Option<u32>,
        colno: Option<u32>,
        stack: Option<String>,
    },
    UnhandledRejection {
        reason: String,
        stack: Option<String>,
    },
    /// An element failed to load its resource
    ResourceError { tag: String, src: String },
    Click(ClickEvent),
    Scroll {
        scroll_top: f64,
        scroll_height: f64,
        client_height: f64,
    },
    VisibilityChange { hidden: bool },
    PageShow { persisted: bool },
    PageHide { persisted: bool },
    HashChange { old_url: String, new_url: String },
    PopState { url: String },
    Vital(VitalMetric),
    NavigationTiming(NavigationTiming),
    ResourceTiming(ResourceTiming),
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::Error { .. } => HostEventKind::Error,
            HostEvent::UnhandledRejection { .. } => HostEventKind::UnhandledRejection,
            HostEvent::ResourceError { .. } => HostEventKind::ResourceError,
            HostEvent::Click(_) => HostEventKind::Click,
            HostEvent::Scroll { .. } => HostEventKind::Scroll,
            HostEvent::VisibilityChange { .. } => HostEventKind::VisibilityChange,
            HostEvent::PageShow { .. } => HostEventKind::PageShow,
            HostEvent::PageHide { .. } => HostEventKind::PageHide,
            HostEvent::HashChange { .. } => HostEventKind::HashChange,
            HostEvent::PopState { .. } => HostEventKind::PopState,
            HostEvent::Vital(_) => HostEventKind::Vital,
            HostEvent::NavigationTiming(_) => HostEventKind::NavigationTiming,
            HostEvent::ResourceTiming(_) => HostEventKind::ResourceTiming,
        }
    }
}

/// Pointer interaction on an element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickEvent {
    /// CSS-style selector of the target
    pub target: String,
    pub xpath: String,
    /// Visible text of the target
    pub text: String,
    pub tag_name: String,
    pub x: f64,
    pub y: f64,
}

/// A core vital measurement (CLS, FID, LCP, FCP, TTFB, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct VitalMetric {
    pub name: String,
    pub value: f64,
    pub navigation_type: Option<String>,
}

/// Page load phase durations in milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationTiming {
    pub dns: f64,
    pub tcp: f64,
    pub ssl: f64,
    pub request: f64,
    pub response: f64,
    pub dom: f64,
    pub load: f64,
    pub total: f64,
    pub navigation_type: Option<String>,
}

impl NavigationTiming {
    /// Phases in reporting order
    pub fn phases(&self) -> [(&'static str, f64); 8] {
        [
            ("dns", self.dns),
            ("tcp", self.tcp),
            ("ssl", self.ssl),
            ("request", self.request),
            ("response", self.response),
            ("dom", self.dom),
            ("load", self.load),
            ("total", self.total),
        ]
    }
}

/// Load timing of a single resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTiming {
    pub url: String,
    pub duration: f64,
    pub transfer_size: u64,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
}

/// History-style navigation primitive
pub trait Navigator: Send + Sync {
    fn push_state(&self, url: &str);
    fn replace_state(&self, url: &str);
}

/// What integrations can see of the host
pub trait Environment: Send + Sync {
    fn current_url(&self) -> String;

    fn client_agent(&self) -> String;

    /// Subscribe to one kind of host event
    fn add_listener(&self, kind: HostEventKind, listener: Listener) -> ListenerId;

    /// Returns false if the id was not registered
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Currently installed navigation primitive
    fn navigator(&self) -> Arc<dyn Navigator>;

    /// Install a navigator, returning the one it replaces
    fn replace_navigator(&self, navigator: Arc<dyn Navigator>) -> Arc<dyn Navigator>;
}

/// Navigator that ignores every call
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn push_state(&self, _url: &str) {}
    fn replace_state(&self, _url: &str) {}
}

/// Environment with no host behind it
///
/// Reports empty url and agent strings; listeners are accepted but never
/// fire.
pub struct NullEnvironment {
    next_id: AtomicU64,
    navigator: Mutex<Arc<dyn Navigator>>,
}

impl NullEnvironment {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            navigator: Mutex::new(Arc::new(NoopNavigator)),
        }
    }
}

impl Default for NullEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NullEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullEnvironment")
    }
}

impl Environment for NullEnvironment {
    fn current_url(&self) -> String {
        String::new()
    }

    fn client_agent(&self) -> String {
        String::new()
    }

    fn add_listener(&self, _kind: HostEventKind, _listener: Listener) -> ListenerId {
        ListenerId::next(&self.next_id)
    }

    fn remove_listener(&self, _id: ListenerId) -> bool {
        false
    }

    fn navigator(&self) -> Arc<dyn Navigator> {
        self.navigator.lock().clone()
    }

    fn replace_navigator(&self, navigator: Arc<dyn Navigator>) -> Arc<dyn Navigator> {
        std::mem::replace(&mut *self.navigator.lock(), navigator)
    }
}
