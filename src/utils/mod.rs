// src/utils/mod.rs
//! Common utilities: configuration, errors, clock

pub mod clock;
pub mod config;
pub mod errors;

pub use clock::{new_session_id, MonotonicClock};
pub use config::{MonitorConfig, MonitorOptions};
pub use errors::{MonitorError, Result};
