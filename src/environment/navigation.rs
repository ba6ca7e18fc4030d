// src/environment/navigation.rs
//! Programmatic navigation observer
//!
//! Wraps the environment's navigator so every `push_state` / `replace_state`
//! is reported after the original has run. Uninstall puts the original
//! navigator back when this observer's wrapper is still the outermost one;
//! otherwise the wrapper stays in the chain as a silent pass-through so
//! observers installed later keep working.

use crate::environment::{Environment, Navigator};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
}

impl NavigationKind {
    /// Route change type reported on the wire
    pub fn route_type(&self) -> &'static str {
        match self {
            NavigationKind::Push => "pushState",
            NavigationKind::Replace => "replaceState",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationChange {
    pub kind: NavigationKind,
    pub url: String,
}

pub type NavigationCallback = Arc<dyn Fn(&NavigationChange) + Send + Sync>;

struct ObservedNavigator {
    inner: Arc<dyn Navigator>,
    callback: NavigationCallback,
    active: AtomicBool,
}

impl ObservedNavigator {
    fn report(&self, kind: NavigationKind, url: &str) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        (self.callback)(&NavigationChange {
            kind,
            url: url.to_string(),
        });
    }
}

impl Navigator for ObservedNavigator {
    fn push_state(&self, url: &str) {
        self.inner.push_state(url);
        self.report(NavigationKind::Push, url);
    }

    fn replace_state(&self, url: &str) {
        self.inner.replace_state(url);
        self.report(NavigationKind::Replace, url);
    }
}

struct Installed {
    wrapper: Arc<ObservedNavigator>,
    previous: Arc<dyn Navigator>,
}

pub struct NavigationObserver {
    environment: Arc<dyn Environment>,
    callback: NavigationCallback,
    installed: Mutex<Option<Installed>>,
}

impl NavigationObserver {
    pub fn new(environment: Arc<dyn Environment>, callback: NavigationCallback) -> Self {
        Self {
            environment,
            callback,
            installed: Mutex::new(None),
        }
    }

    /// Start observing; a second call is a no-op
    pub fn install(&self) {
        let mut installed = self.installed.lock();
        if installed.is_some() {
            return;
        }

        let wrapper = Arc::new(ObservedNavigator {
            inner: self.environment.navigator(),
            callback: self.callback.clone(),
            active: AtomicBool::new(true),
        });
        let previous = self.environment.replace_navigator(wrapper.clone());
        *installed = Some(Installed { wrapper, previous });
        debug!("Navigation observer installed");
    }

    /// Stop reporting and restore the navigator captured at install
    ///
    /// The navigator is only swapped back if this observer's wrapper is
    /// still the one installed.
    pub fn uninstall(&self) {
        let Some(Installed { wrapper, previous }) = self.installed.lock().take() else {
            return;
        };
        wrapper.active.store(false, Ordering::SeqCst);

        let ours: Arc<dyn Navigator> = wrapper;
        if Arc::ptr_eq(&self.environment.navigator(), &ours) {
            self.environment.replace_navigator(previous);
            debug!("Navigation observer uninstalled");
        } else {
            debug!("Navigation observer uninstalled; wrapper left as pass-through");
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.lock().is_some()
    }
}

impl Drop for NavigationObserver {
    fn drop(&mut self) {
        self.uninstall();
    }
}
