// src/environment/host.rs
//! In-process host environment
//!
//! The embedding application owns a `HostEnvironment`, feeds it host events
//! with `dispatch`, and drives navigation through `push_state` /
//! `replace_state`, which always go through the currently installed
//! navigator.

use crate::environment::{
    Environment, HostEvent, HostEventKind, Listener, ListenerId, Navigator,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tracing::debug;

/// Navigator that updates the host's current URL
struct HistoryNavigator {
    url: Arc<RwLock<String>>,
}

impl Navigator for HistoryNavigator {
    fn push_state(&self, url: &str) {
        *self.url.write() = url.to_string();
    }

    fn replace_state(&self, url: &str) {
        *self.url.write() = url.to_string();
    }
}

struct Registration {
    id: ListenerId,
    kind: HostEventKind,
    listener: Listener,
}

pub struct HostEnvironment {
    url: Arc<RwLock<String>>,
    client_agent: String,
    listeners: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
    navigator: Mutex<Arc<dyn Navigator>>,
}

impl HostEnvironment {
    pub fn new(url: impl Into<String>, client_agent: impl Into<String>) -> Self {
        let url = Arc::new(RwLock::new(url.into()));
        let navigator: Arc<dyn Navigator> = Arc::new(HistoryNavigator { url: url.clone() });

        Self {
            url,
            client_agent: client_agent.into(),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            navigator: Mutex::new(navigator),
        }
    }

    /// Deliver an event to every listener of its kind, in registration order
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: HostEvent) -> usize {
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.listener.clone())
            .collect();

        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.write() = url.into();
    }

    pub fn push_state(&self, url: &str) {
        self.navigator().push_state(url);
    }

    pub fn replace_state(&self, url: &str) {
        self.navigator().replace_state(url);
    }

    /// Change only the fragment-style URL and raise a hash change
    pub fn navigate_hash(&self, url: impl Into<String>) {
        let new_url = url.into();
        let old_url = std::mem::replace(&mut *self.url.write(), new_url.clone());
        self.dispatch(HostEvent::HashChange { old_url, new_url });
    }

    /// Move through history and raise a pop state
    pub fn pop_state(&self, url: impl Into<String>) {
        let url = url.into();
        self.set_url(url.clone());
        self.dispatch(HostEvent::PopState { url });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn listener_count_for(&self, kind: HostEventKind) -> usize {
        self.listeners.lock().iter().filter(|r| r.kind == kind).count()
    }
}

impl Environment for HostEnvironment {
    fn current_url(&self) -> String {
        self.url.read().clone()
    }

    fn client_agent(&self) -> String {
        self.client_agent.clone()
    }

    fn add_listener(&self, kind: HostEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId::next(&self.next_id);
        self.listeners.lock().push(Registration { id, kind, listener });
        debug!("Listener {:?} added for {:?}", id, kind);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        before != listeners.len()
    }

    fn navigator(&self) -> Arc<dyn Navigator> {
        self.navigator.lock().clone()
    }

    fn replace_navigator(&self, navigator: Arc<dyn Navigator>) -> Arc<dyn Navigator> {
        std::mem::replace(&mut *self.navigator.lock(), navigator)
    }
}

impl fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("url", &*self.url.read())
            .field("client_agent", &self.client_agent)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
