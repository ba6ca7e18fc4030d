// src/reporter/mod.rs
//! Batched reporting and delivery
//!
//! - **Reporter**: queue + size/timer flush policy
//! - **Transport**: pluggable delivery strategies with fallback

pub mod batch_reporter;
pub mod transport;

pub use batch_reporter::{FlushReason, Reporter, ReporterConfig, ReporterStats};
pub use transport::{
    DispatchOutcome, Transport, TransportDispatcher, TransportMethod, Transports,
};
