//! Sink delivery counters
//!
//! Every sink keeps a [`SinkMetrics`] that the producer side and the worker
//! update with relaxed atomics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one sink's delivery pipeline
///
/// # Example
///
/// ```
/// use sinklog::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
/// metrics.record_submitted();
/// metrics.record_written();
///
/// assert_eq!(metrics.submitted(), 1);
/// assert_eq!(metrics.written(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records accepted into the queue
    submitted: AtomicU64,

    /// Records handed to the writer successfully
    written: AtomicU64,

    /// Records offered while the sink was stopped
    rejected: AtomicU64,

    /// Records whose write failed or panicked
    failed: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            written: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    /// Failure rate among processed records as a percentage (0.0 - 100.0)
    pub fn failure_rate(&self) -> f64 {
        let failed = self.failed() as f64;
        let total = self.written() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.written.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}
