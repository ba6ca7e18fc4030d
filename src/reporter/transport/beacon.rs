// src/reporter/transport/beacon.rs
//! Persistent beacon delivery
//!
//! Payloads are handed to a long-lived worker thread over a bounded channel
//! and the caller returns immediately. A full channel drops the batch. On
//! shutdown the worker gets a short grace period to drain what is queued;
//! after that it is detached and discards the remainder.

use crate::observability::{Diagnostics, TRANSPORT_FAILURES};
use crate::recording::serializer::Payload;
use crate::reporter::transport::{http, Transport};
use crate::utils::errors::{MonitorError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Batches waiting for the worker before new ones are dropped
pub const BEACON_QUEUE_CAPACITY: usize = 64;

/// How long shutdown waits for the worker to drain
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

struct BeaconJob {
    endpoint: String,
    body: String,
    content_type: &'static str,
}

struct Worker {
    handle: JoinHandle<()>,
    /// Disconnects when the worker thread exits
    finished: Receiver<()>,
    abandoned: Arc<AtomicBool>,
}

/// Fire-and-forget delivery through a background worker
pub struct BeaconTransport {
    sender: Mutex<Option<Sender<BeaconJob>>>,
    worker: Mutex<Option<Worker>>,
    diagnostics: Diagnostics,
    grace: Duration,
}

impl BeaconTransport {
    /// Start the delivery worker
    ///
    /// If the thread cannot be spawned the transport reports itself
    /// unavailable and the dispatcher falls back.
    pub fn spawn(timeout: Duration, diagnostics: Diagnostics) -> Self {
        Self::with_limits(timeout, BEACON_QUEUE_CAPACITY, SHUTDOWN_GRACE, diagnostics)
    }

    pub fn with_limits(
        timeout: Duration,
        capacity: usize,
        grace: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<BeaconJob>(capacity.max(1));
        let (finished_tx, finished) = crossbeam_channel::bounded::<()>(0);
        let abandoned = Arc::new(AtomicBool::new(false));
        let worker_abandoned = abandoned.clone();
        let worker_diagnostics = diagnostics.clone();

        let spawned = std::thread::Builder::new()
            .name("monitor-beacon".to_string())
            .spawn(move || {
                let _finished = finished_tx;
                run_worker(rx, timeout, worker_abandoned, worker_diagnostics)
            });

        match spawned {
            Ok(handle) => Self {
                sender: Mutex::new(Some(tx)),
                worker: Mutex::new(Some(Worker {
                    handle,
                    finished,
                    abandoned,
                })),
                diagnostics,
                grace,
            },
            Err(e) => {
                warn!("Failed to start beacon worker: {}", e);
                diagnostics.error(format_args!("beacon worker unavailable: {}", e));
                Self {
                    sender: Mutex::new(None),
                    worker: Mutex::new(None),
                    diagnostics,
                    grace,
                }
            }
        }
    }

    /// Stop accepting beacons and give queued ones the grace period to go out
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());

        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        match worker.finished.recv_timeout(self.grace) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                if worker.handle.join().is_err() {
                    warn!("Beacon worker panicked during shutdown");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                worker.abandoned.store(true, Ordering::SeqCst);
                warn!("Beacon worker still busy after {:?}; detaching", self.grace);
                self.diagnostics
                    .warn("beacon worker did not drain in time; pending beacons discarded");
            }
        }
    }
}

fn run_worker(
    rx: Receiver<BeaconJob>,
    timeout: Duration,
    abandoned: Arc<AtomicBool>,
    diagnostics: Diagnostics,
) {
    let client = match http::blocking_client(timeout) {
        Ok(client) => client,
        Err(e) => {
            diagnostics.error(format_args!("beacon worker stopped: {}", e));
            return;
        }
    };

    for job in rx.iter() {
        if abandoned.load(Ordering::SeqCst) {
            continue;
        }
        let size = job.body.len();
        match http::post(&client, &job.endpoint, job.body, job.content_type) {
            Ok(()) => debug!("Beacon delivered ({} bytes)", size),
            Err(e) => {
                metrics::counter!(TRANSPORT_FAILURES, "strategy" => "beacon").increment(1);
                diagnostics.warn(format_args!("beacon delivery failed: {}", e));
            }
        }
    }

    debug!("Beacon worker drained and stopped");
}

impl Transport for BeaconTransport {
    fn name(&self) -> &'static str {
        "beacon"
    }

    fn is_available(&self) -> bool {
        self.sender.lock().is_some()
    }

    fn send(&self, endpoint: &str, payload: &Payload) -> Result<()> {
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or(MonitorError::TransportUnavailable("beacon"))?;

        let job = BeaconJob {
            endpoint: endpoint.to_string(),
            body: payload.body.clone(),
            content_type: payload.content_type(),
        };
        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                metrics::counter!(TRANSPORT_FAILURES, "strategy" => "beacon").increment(1);
                self.diagnostics.warn("beacon queue full; dropping batch");
                Err(MonitorError::TransportFailed("beacon queue full".to_string()))
            }
            // The worker is gone (client could not be built); fall back
            Err(TrySendError::Disconnected(_)) => {
                Err(MonitorError::TransportUnavailable("beacon"))
            }
        }
    }
}

impl Drop for BeaconTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
