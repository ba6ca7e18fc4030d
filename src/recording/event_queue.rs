// src/recording/event_queue.rs
//! Outgoing record queue
//!
//! A FIFO owned by the reporter. `drain` detaches the whole contents under
//! the lock and leaves an empty queue behind, so a record pushed while a
//! batch is being sent lands in the next batch instead of being lost or sent
//! twice.

use crate::recording::record::Record;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Record queue with push/drain accounting
#[derive(Debug)]
pub struct EventQueue {
    /// Pending records, oldest first
    records: Mutex<Vec<Record>>,

    /// Length that should trigger a flush
    threshold: usize,

    /// Push counter
    push_count: AtomicU64,

    /// Records handed out through `drain`
    drain_count: AtomicU64,

    /// Number of non-empty drains
    batch_count: AtomicU64,
}

impl EventQueue {
    /// Create a queue that reports full at `threshold` records
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Mutex::new(Vec::with_capacity(threshold)),
            threshold,
            push_count: AtomicU64::new(0),
            drain_count: AtomicU64::new(0),
            batch_count: AtomicU64::new(0),
        }
    }

    /// Append a record, returning the new length
    pub fn push(&self, record: Record) -> usize {
        let mut records = self.records.lock();
        records.push(record);
        self.push_count.fetch_add(1, Ordering::Relaxed);
        records.len()
    }

    /// Detach every queued record, leaving the queue empty
    pub fn drain(&self) -> Vec<Record> {
        let batch = {
            let mut records = self.records.lock();
            if records.is_empty() {
                return Vec::new();
            }
            std::mem::replace(&mut *records, Vec::with_capacity(self.threshold))
        };

        self.drain_count.fetch_add(batch.len() as u64, Ordering::Relaxed);
        self.batch_count.fetch_add(1, Ordering::Relaxed);
        batch
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Check whether the flush threshold has been reached
    pub fn is_full(&self) -> bool {
        self.len() >= self.threshold
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            push_count: self.push_count.load(Ordering::Relaxed),
            drain_count: self.drain_count.load(Ordering::Relaxed),
            batch_count: self.batch_count.load(Ordering::Relaxed),
            current_size: self.len(),
            threshold: self.threshold,
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// Total records pushed
    pub push_count: u64,

    /// Total records detached into batches
    pub drain_count: u64,

    /// Batches detached
    pub batch_count: u64,

    /// Current queue size
    pub current_size: usize,

    /// Flush threshold
    pub threshold: usize,
}

impl QueueStats {
    /// Calculate fill percentage relative to the flush threshold
    pub fn fill_percentage(&self) -> f64 {
        (self.current_size as f64 / self.threshold as f64) * 100.0
    }

    /// Average records per detached batch
    pub fn avg_batch_size(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.drain_count as f64 / self.batch_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::record::{BaseData, BehaviorRecord, Extra};
    use std::sync::Arc;

    fn create_test_record(name: &str) -> Record {
        Record::Behavior(BehaviorRecord::new(
            BaseData {
                app_id: "app".into(),
                timestamp: 0,
                source_url: String::new(),
                client_agent: String::new(),
                session_id: "s".into(),
            },
            name,
            Extra::new(),
        ))
    }

    fn event_name(record: &Record) -> &str {
        match record {
            Record::Behavior(b) => &b.event_name,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_queue_creation() {
        let queue = EventQueue::new(10);
        assert_eq!(queue.threshold(), 10);
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());

        // zero is bumped to one
        assert_eq!(EventQueue::new(0).threshold(), 1);
    }

    #[test]
    fn test_push_drain_fifo() {
        let queue = EventQueue::new(10);
        assert_eq!(queue.push(create_test_record("a")), 1);
        assert_eq!(queue.push(create_test_record("b")), 2);

        let batch = queue.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(event_name(&batch[0]), "a");
        assert_eq!(event_name(&batch[1]), "b");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_empty() {
        let queue = EventQueue::new(2);
        assert!(queue.drain().is_empty());
        assert_eq!(queue.stats().batch_count, 0);
    }

    #[test]
    fn test_is_full_at_threshold() {
        let queue = EventQueue::new(2);
        queue.push(create_test_record("a"));
        assert!(!queue.is_full());
        queue.push(create_test_record("b"));
        assert!(queue.is_full());
    }

    #[test]
    fn test_stats() {
        let queue = EventQueue::new(4);
        queue.push(create_test_record("a"));
        queue.push(create_test_record("b"));
        queue.drain();
        queue.push(create_test_record("c"));

        let stats = queue.stats();
        assert_eq!(stats.push_count, 3);
        assert_eq!(stats.drain_count, 2);
        assert_eq!(stats.batch_count, 1);
        assert_eq!(stats.current_size, 1);
        assert_eq!(stats.fill_percentage(), 25.0);
        assert_eq!(stats.avg_batch_size(), 2.0);
    }

    #[test]
    fn test_concurrent_push_and_drain_loses_nothing() {
        use std::thread;

        let queue = Arc::new(EventQueue::new(1000));
        let drained = Arc::new(Mutex::new(0usize));
        let mut handles = vec![];

        for i in 0..8 {
            let q = Arc::clone(&queue);
            let d = Arc::clone(&drained);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    q.push(create_test_record(&format!("evt_{}_{}", i, j)));
                    if j % 10 == 0 {
                        *d.lock() += q.drain().len();
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let total = *drained.lock() + queue.drain().len();
        assert_eq!(total, 800);
    }
}
