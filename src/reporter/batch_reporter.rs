// src/reporter/batch_reporter.rs
//! Batched delivery of accepted records
//!
//! Records accumulate in an `EventQueue` until either the queue reaches
//! `max_queue_size` (flushed synchronously by the adding caller) or the
//! interval timer fires. A flush detaches the queue under its lock, so two
//! racing flushes never send the same record twice.
//!
//! The timer runs as a task on the current tokio runtime when there is one,
//! and on a dedicated ticker thread otherwise.

use crate::observability::Diagnostics;
use crate::recording::event_queue::{EventQueue, QueueStats};
use crate::recording::record::Record;
use crate::recording::serializer::serialize_batch;
use crate::reporter::transport::{DispatchOutcome, TransportDispatcher};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reporter configuration
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Queue length that triggers an immediate flush
    pub max_queue_size: usize,

    /// Timer flush period
    pub flush_interval: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            max_queue_size: crate::utils::config::DEFAULT_MAX_QUEUE_SIZE,
            flush_interval: Duration::from_millis(crate::utils::config::DEFAULT_FLUSH_INTERVAL_MS),
        }
    }
}

/// What triggered a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Size,
    Timer,
    Explicit,
}

/// Batching reporter
pub struct Reporter {
    config: ReporterConfig,
    queue: EventQueue,
    dispatcher: TransportDispatcher,
    diagnostics: Diagnostics,
    timer: Mutex<Option<FlushTimer>>,
    destroyed: AtomicBool,
    stats: ReporterCounters,
}

/// Running interval flusher
enum FlushTimer {
    /// Task on a tokio runtime
    Task(CancellationToken),
    /// Ticker thread; dropping the sender stops it
    Thread(Sender<()>),
}

impl FlushTimer {
    fn stop(self) {
        match self {
            FlushTimer::Task(token) => token.cancel(),
            FlushTimer::Thread(shutdown) => drop(shutdown),
        }
    }
}

#[derive(Debug, Default)]
struct ReporterCounters {
    enqueued: AtomicU64,
    size_flushes: AtomicU64,
    timer_flushes: AtomicU64,
    explicit_flushes: AtomicU64,
    batches_sent: AtomicU64,
    records_sent: AtomicU64,
    batches_dropped: AtomicU64,
}

impl Reporter {
    pub fn new(
        config: ReporterConfig,
        dispatcher: TransportDispatcher,
        diagnostics: Diagnostics,
    ) -> Arc<Self> {
        info!(
            "Initializing reporter (max_queue_size={}, flush_interval={:?}, transport={})",
            config.max_queue_size,
            config.flush_interval,
            dispatcher.method()
        );

        Arc::new(Self {
            queue: EventQueue::new(config.max_queue_size),
            config,
            dispatcher,
            diagnostics,
            timer: Mutex::new(None),
            destroyed: AtomicBool::new(false),
            stats: ReporterCounters::default(),
        })
    }

    /// Queue a record, flushing immediately once the threshold is reached
    pub fn add(&self, record: Record) {
        let len = self.queue.push(record);
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);

        if len >= self.queue.threshold() {
            self.flush_with(FlushReason::Size);
        }
    }

    /// Send everything queued so far
    pub fn flush(&self) {
        self.flush_with(FlushReason::Explicit);
    }

    fn flush_with(&self, reason: FlushReason) {
        let counter = match reason {
            FlushReason::Size => &self.stats.size_flushes,
            FlushReason::Timer => &self.stats.timer_flushes,
            FlushReason::Explicit => &self.stats.explicit_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let batch = self.queue.drain();
        if batch.is_empty() {
            return;
        }

        debug!("Flushing {} records ({:?})", batch.len(), reason);
        self.send(&batch);
    }

    fn send(&self, batch: &[Record]) {
        let payload = serialize_batch(batch);
        if !payload.is_json {
            self.diagnostics
                .warn("batch could not be encoded as JSON; sending text coercion");
        }

        match self.dispatcher.dispatch(&payload) {
            DispatchOutcome::Sent(_) => {
                self.stats.batches_sent.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .records_sent
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
            }
            DispatchOutcome::Failed(_) | DispatchOutcome::NoTransport => {
                self.stats.batches_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Start the recurring flush
    ///
    /// Spawns onto the current tokio runtime when called inside one, else
    /// starts a ticker thread. Returns false when the timer is already
    /// running, the reporter has been destroyed, or no thread could be
    /// started.
    pub fn start_timer(self: &Arc<Self>) -> bool {
        let mut timer = self.timer.lock();
        if timer.is_some() || self.destroyed.load(Ordering::SeqCst) {
            return false;
        }

        let reporter = Arc::downgrade(self);
        let period = self.config.flush_interval;

        let started = match Handle::try_current() {
            Ok(handle) => {
                let token = CancellationToken::new();
                handle.spawn(run_timer(reporter, period, token.clone()));
                FlushTimer::Task(token)
            }
            Err(_) => {
                let (shutdown, stopped) = crossbeam_channel::bounded(0);
                let spawned = std::thread::Builder::new()
                    .name("monitor-flush-timer".to_string())
                    .spawn(move || run_timer_thread(reporter, period, stopped));
                if let Err(e) = spawned {
                    self.diagnostics.warn(format_args!(
                        "could not start flush timer thread: {}; flushing on size and destroy only",
                        e
                    ));
                    return false;
                }
                FlushTimer::Thread(shutdown)
            }
        };
        *timer = Some(started);

        debug!("Flush timer started ({:?})", period);
        true
    }

    pub fn timer_active(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Stop the timer and send whatever is left
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(timer) = self.timer.lock().take() {
            timer.stop();
        }

        self.flush_with(FlushReason::Explicit);
        info!("Reporter destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &TransportDispatcher {
        &self.dispatcher
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Get reporter statistics
    pub fn stats(&self) -> ReporterStats {
        ReporterStats {
            records_enqueued: self.stats.enqueued.load(Ordering::Relaxed),
            size_flushes: self.stats.size_flushes.load(Ordering::Relaxed),
            timer_flushes: self.stats.timer_flushes.load(Ordering::Relaxed),
            explicit_flushes: self.stats.explicit_flushes.load(Ordering::Relaxed),
            batches_sent: self.stats.batches_sent.load(Ordering::Relaxed),
            records_sent: self.stats.records_sent.load(Ordering::Relaxed),
            batches_dropped: self.stats.batches_dropped.load(Ordering::Relaxed),
        }
    }
}

async fn run_timer(reporter: Weak<Reporter>, period: Duration, cancelled: CancellationToken) {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);

    loop {
        tokio::select! {
            _ = cancelled.cancelled() => break,
            _ = interval.tick() => {
                match reporter.upgrade() {
                    Some(reporter) if !reporter.is_destroyed() => {
                        reporter.flush_with(FlushReason::Timer)
                    }
                    _ => break,
                }
            }
        }
    }

    debug!("Flush timer stopped");
}

fn run_timer_thread(reporter: Weak<Reporter>, period: Duration, stopped: Receiver<()>) {
    let ticks = crossbeam_channel::tick(period);

    loop {
        crossbeam_channel::select! {
            recv(stopped) -> _ => break,
            recv(ticks) -> _ => {
                match reporter.upgrade() {
                    Some(reporter) if !reporter.is_destroyed() => {
                        reporter.flush_with(FlushReason::Timer)
                    }
                    _ => break,
                }
            }
        }
    }

    debug!("Flush timer thread stopped");
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.stop();
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.config)
            .field("queue_len", &self.queue.len())
            .field("transport", &self.dispatcher.method())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Reporter statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub records_enqueued: u64,
    pub size_flushes: u64,
    pub timer_flushes: u64,
    pub explicit_flushes: u64,
    pub batches_sent: u64,
    pub records_sent: u64,
    pub batches_dropped: u64,
}

impl ReporterStats {
    pub fn avg_batch_size(&self) -> f64 {
        if self.batches_sent == 0 {
            0.0
        } else {
            self.records_sent as f64 / self.batches_sent as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::record::{BaseData, BehaviorRecord, Extra};
    use crate::reporter::transport::test_support::RecordingTransport;
    use crate::reporter::transport::{TransportMethod, Transports};
    use proptest::prelude::*;
    use serde_json::json;

    fn click(x: i64) -> Record {
        let mut data = Extra::new();
        data.insert("x".into(), json!(x));
        Record::Behavior(BehaviorRecord::new(
            BaseData {
                app_id: "abc123".into(),
                timestamp: 1,
                source_url: String::new(),
                client_agent: String::new(),
                session_id: "s".into(),
            },
            "click",
            data,
        ))
    }

    fn reporter(max: usize, interval_ms: u64) -> (Arc<Reporter>, Arc<RecordingTransport>) {
        let transport = RecordingTransport::new("recording");
        let dispatcher = TransportDispatcher::new(
            TransportMethod::Beacon,
            "https://host/api/v1/monitoring/abc123",
            Transports::uniform(transport.clone()),
            Diagnostics::disabled(),
        );
        let reporter = Reporter::new(
            ReporterConfig {
                max_queue_size: max,
                flush_interval: Duration::from_millis(interval_ms),
            },
            dispatcher,
            Diagnostics::disabled(),
        );
        (reporter, transport)
    }

    #[test]
    fn test_size_threshold_sends_one_batch() {
        let (reporter, transport) = reporter(2, 100_000);

        reporter.add(click(1));
        assert_eq!(transport.sends(), 0);
        reporter.add(click(1));

        assert_eq!(transport.sends(), 1);
        let batches = transport.batches();
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][0]["type"], "behavior");
        assert_eq!(batches[0][0]["data"]["x"], 1);
        assert_eq!(reporter.queue_len(), 0);
        assert_eq!(reporter.stats().size_flushes, 1);
    }

    #[test]
    fn test_empty_flush_sends_nothing() {
        let (reporter, transport) = reporter(10, 100_000);
        reporter.flush();
        reporter.flush();
        assert_eq!(transport.sends(), 0);
        assert_eq!(reporter.stats().explicit_flushes, 2);
    }

    #[test]
    fn test_batch_order_preserved() {
        let (reporter, transport) = reporter(10, 100_000);
        for x in 0..5 {
            reporter.add(click(x));
        }
        reporter.flush();

        let batch = &transport.batches()[0];
        let xs: Vec<i64> = batch.iter().map(|r| r["data"]["x"].as_i64().unwrap()).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_timer_flushes_without_runtime() {
        let (reporter, transport) = reporter(10, 50);
        assert!(reporter.start_timer());
        assert!(reporter.timer_active());
        assert!(!reporter.start_timer());

        reporter.add(click(3));
        std::thread::sleep(Duration::from_millis(400));

        assert_eq!(transport.sends(), 1);
        assert_eq!(reporter.queue_len(), 0);
        assert!(reporter.stats().timer_flushes >= 1);
    }

    #[test]
    fn test_destroy_stops_timer_thread() {
        let (reporter, transport) = reporter(10, 50);
        assert!(reporter.start_timer());
        reporter.add(click(1));

        reporter.destroy();
        assert!(!reporter.timer_active());
        assert_eq!(transport.sends(), 1);

        let timer_flushes = reporter.stats().timer_flushes;
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(reporter.stats().timer_flushes, timer_flushes);
    }

    #[tokio::test]
    async fn test_timer_flushes_pending_records() {
        let (reporter, transport) = reporter(10, 50);
        assert!(reporter.start_timer());
        assert!(!reporter.start_timer());

        reporter.add(click(7));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(transport.sends(), 1);
        assert_eq!(reporter.queue_len(), 0);
        assert!(reporter.stats().timer_flushes >= 1);
    }

    #[tokio::test]
    async fn test_destroy_stops_timer_and_final_flushes() {
        let (reporter, transport) = reporter(10, 50);
        reporter.start_timer();
        reporter.add(click(1));
        reporter.add(click(2));

        reporter.destroy();
        assert!(!reporter.timer_active());
        assert_eq!(transport.sends(), 1);
        assert_eq!(transport.batches()[0].len(), 2);
        assert_eq!(reporter.queue_len(), 0);

        let timer_flushes = reporter.stats().timer_flushes;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(reporter.stats().timer_flushes, timer_flushes);

        reporter.destroy();
        assert_eq!(transport.sends(), 1);
        assert!(!reporter.start_timer());
    }

    #[test]
    fn test_failed_dispatch_drops_batch() {
        let (reporter, transport) = reporter(1, 100_000);
        transport.set_fail(true);

        reporter.add(click(1));
        let stats = reporter.stats();
        assert_eq!(stats.batches_dropped, 1);
        assert_eq!(stats.batches_sent, 0);
        assert_eq!(reporter.queue_len(), 0);
    }

    #[test]
    fn test_concurrent_adds_send_each_record_once() {
        let (reporter, transport) = reporter(7, 100_000);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let reporter = Arc::clone(&reporter);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        reporter.add(click(t * 1000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        reporter.flush();

        let mut seen: Vec<i64> = transport
            .batches()
            .iter()
            .flatten()
            .map(|r| r["data"]["x"].as_i64().unwrap())
            .collect();
        seen.sort_unstable();
        let mut expected: Vec<i64> = (0..4).flat_map(|t| (0..250).map(move |i| t * 1000 + i)).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    proptest! {
        #[test]
        fn prop_queue_never_reaches_threshold_after_add(max in 1usize..20, adds in 0usize..100) {
            let (reporter, transport) = reporter(max, 100_000);
            for i in 0..adds {
                reporter.add(click(i as i64));
                prop_assert!(reporter.queue_len() < max);
            }
            prop_assert_eq!(transport.sends(), adds / max);
        }
    }
}
