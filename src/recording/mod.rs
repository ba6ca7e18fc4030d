// src/recording/mod.rs
//! Record model, queueing and sampling
//!
//! - **Record**: tagged error / performance / behavior records with `BaseData`
//! - **Event Queue**: FIFO the reporter drains into batches
//! - **Sampler**: independent per-call keep/discard gate
//! - **Serializer**: batch → JSON payload with a text fallback
//!
//! # Architecture
//!
//! ```text
//! capture_*() → Record + BaseData → Sampler ──drop──▶ (nothing)
//!                                      │
//!                                    keep
//!                                      ▼
//!                                 observers
//!                                      ▼
//!                               EventQueue.push()
//!                                      │  len ≥ max  or  timer tick
//!                                      ▼
//!                               EventQueue.drain()
//!                                      ▼
//!                              serialize_batch()
//!                                      ▼
//!                                  transport
//! ```

pub mod event_queue;
pub mod record;
pub mod sampler;
pub mod serializer;

// Re-export commonly used types
pub use event_queue::{EventQueue, QueueStats};
pub use record::{
    BaseData, BehaviorRecord, CapturedError, ErrorKind, ErrorRecord, Extra, MetricCategory,
    PerformanceRecord, Rating, Record,
};
pub use sampler::Sampler;
pub use serializer::{serialize_batch, Payload};
