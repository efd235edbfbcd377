//! Shared FIFO of raw collector lines.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::observability::metrics;

/// Concurrency-safe line queue. Callers never hold the lock themselves.
#[derive(Debug, Default)]
pub struct TelemetryQueue {
    lines: Mutex<VecDeque<String>>,
}

impl TelemetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the tail.
    pub fn enqueue(&self, line: String) {
        let depth = {
            let mut lines = self.lines.lock();
            lines.push_back(line);
            lines.len()
        };
        metrics::record_queue_depth(depth);
    }

    /// Remove up to `max` lines from the head, oldest first.
    pub fn dequeue_batch(&self, max: usize) -> Vec<String> {
        let (batch, depth) = {
            let mut lines = self.lines.lock();
            let take = max.min(lines.len());
            let batch: Vec<String> = lines.drain(..take).collect();
            (batch, lines.len())
        };
        metrics::record_queue_depth(depth);
        batch
    }

    /// Put a failed batch back at the tail, keeping its internal order.
    pub fn requeue(&self, batch: Vec<String>) {
        let depth = {
            let mut lines = self.lines.lock();
            lines.extend(batch);
            lines.len()
        };
        metrics::record_queue_depth(depth);
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}
