// src/pipeline/mod.rs
//! Event pipeline
//!
//! - **Monitor**: capture API, sampling, observer fan-out, lifecycle
//! - **Integration**: setup-once protocol for built-in and custom integrations
//!
//! # Report path
//!
//! ```text
//! capture_error / capture_performance / capture_behavior / track
//!        │
//!        ▼
//!   BaseData (appId, timestamp, url, agent, sessionId) + typed Record
//!        │
//!        ▼
//!   Sampler ── draw ≥ rate ──▶ dropped
//!        │
//!        ▼
//!   observers (each isolated)
//!        │
//!        ▼
//!   Reporter::add
//! ```

pub mod integration;
pub mod monitor;

pub use integration::{Integration, IntegrationContext, IntegrationHooks, Observer, Plugin};
pub use monitor::{Monitor, MonitorApi, MonitorBuilder, MonitorHandle};
