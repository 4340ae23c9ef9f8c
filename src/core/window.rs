//! Bounded recent-history window.
//!
//! Insertion-ordered, fixed capacity, strict FIFO eviction: a push beyond
//! capacity evicts exactly one oldest record, never more. All derived
//! statistics are computed from `snapshot()` copies, so the feature layer
//! never sees a half-mutated buffer.

use crate::source::types::Record;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Fixed-capacity FIFO buffer of parsed records, oldest first.
#[derive(Debug)]
pub struct WindowBuffer {
    records: VecDeque<Record>,
    capacity: usize,
}

impl WindowBuffer {
    /// Create a buffer holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, evicting the single oldest one if the buffer is full.
    pub fn push(&mut self, record: Record) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Handle to a window shared between the pipeline and any observer.
///
/// `push` and `snapshot` take the same lock, so a snapshot never observes an
/// in-progress append/eviction.
#[derive(Debug, Clone)]
pub struct SharedWindow {
    inner: Arc<Mutex<WindowBuffer>>,
}

impl SharedWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WindowBuffer::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowBuffer> {
        // A poisoned lock only means another thread panicked mid-access; the
        // buffer itself is always in a consistent state between operations.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn push(&self, record: Record) {
        self.lock().push(record);
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::TelemetryRecord;
    use chrono::Utc;

    fn record(sequence: i64) -> Record {
        Record::Telemetry(TelemetryRecord {
            sequence,
            device_timestamp: 0,
            received_at: Utc::now(),
            wander: 0.0,
            jitter: 0.0,
            room: false,
            motion: false,
        })
    }

    fn sequences(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| match r {
                Record::Telemetry(t) => t.sequence,
                other => panic!("unexpected record: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_push_below_capacity_keeps_all() {
        let mut window = WindowBuffer::new(5);
        for i in 0..3 {
            window.push(record(i));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(sequences(&window.snapshot()), vec![0, 1, 2]);
    }

    #[test]
    fn test_push_beyond_capacity_evicts_oldest_only() {
        let capacity = 4;
        let extra = 3;
        let mut window = WindowBuffer::new(capacity);
        for i in 0..(capacity + extra) as i64 {
            window.push(record(i));
        }
        // Exactly `capacity` records remain: the last `capacity` pushed, in order.
        assert_eq!(window.len(), capacity);
        assert_eq!(sequences(&window.snapshot()), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = WindowBuffer::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(record(1));
        window.push(record(2));
        assert_eq!(sequences(&window.snapshot()), vec![2]);
    }

    #[test]
    fn test_shared_window_snapshot_during_pushes() {
        let window = SharedWindow::new(64);
        let writer = window.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..500 {
                writer.push(record(i));
            }
        });

        // Snapshots taken while the writer runs must always be internally
        // ordered; size is whatever the writer reached, never above capacity.
        for _ in 0..50 {
            let snap = window.snapshot();
            assert!(snap.len() <= 64);
            let seqs = sequences(&snap);
            assert!(seqs.windows(2).all(|w| w[0] + 1 == w[1]));
        }

        handle.join().expect("writer thread");
        assert_eq!(window.len(), 64);
    }
}
