//! Metrics collection for queue monitoring.

use crate::graph::EdgeKind;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-queue metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Submission counters
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    kernels_panicked: AtomicU64,

    // Backend counters
    work_items: AtomicU64,
    chunks_executed: AtomicU64,
    chunks_stolen: AtomicU64,

    // Dependency edges by kind
    edges_raw: AtomicU64,
    edges_waw: AtomicU64,
    edges_war: AtomicU64,
    edges_explicit: AtomicU64,
    edges_in_order: AtomicU64,

    // Submit-to-completion latency
    latency_histogram: RwLock<Histogram<u64>>,

    shared_bytes_allocated: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // 3 significant figures, max value of 1 hour in nanoseconds
        let histogram = Histogram::new_with_max(3_600_000_000_000, 3)
            .expect("histogram bounds are valid");

        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            kernels_panicked: AtomicU64::new(0),
            work_items: AtomicU64::new(0),
            chunks_executed: AtomicU64::new(0),
            chunks_stolen: AtomicU64::new(0),
            edges_raw: AtomicU64::new(0),
            edges_waw: AtomicU64::new(0),
            edges_war: AtomicU64::new(0),
            edges_explicit: AtomicU64::new(0),
            edges_in_order: AtomicU64::new(0),
            latency_histogram: RwLock::new(histogram),
            shared_bytes_allocated: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_submission(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished node with its submit-to-completion latency
    pub fn record_completion(&self, latency: Duration, failed: bool) {
        if failed {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        }

        let nanos = latency.as_nanos().min(u64::MAX as u128) as u64;
        // values above the histogram bound are clamped to it
        self.latency_histogram.write().saturating_record(nanos);
    }

    pub fn record_kernel_panic(&self) {
        self.kernels_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chunk(&self, work_items: usize) {
        self.chunks_executed.fetch_add(1, Ordering::Relaxed);
        self.work_items.fetch_add(work_items as u64, Ordering::Relaxed);
    }

    pub fn record_chunk_stolen(&self) {
        self.chunks_stolen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_edge(&self, kind: EdgeKind) {
        let counter = match kind {
            EdgeKind::ReadAfterWrite => &self.edges_raw,
            EdgeKind::WriteAfterWrite => &self.edges_waw,
            EdgeKind::WriteAfterRead => &self.edges_war,
            EdgeKind::Explicit => &self.edges_explicit,
            EdgeKind::InOrder => &self.edges_in_order,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shared_allocation(&self, bytes: usize) {
        self.shared_bytes_allocated
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.latency_histogram.read();

        MetricsSnapshot {
            timestamp: Instant::now(),
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            kernels_panicked: self.kernels_panicked.load(Ordering::Relaxed),
            work_items: self.work_items.load(Ordering::Relaxed),
            chunks_executed: self.chunks_executed.load(Ordering::Relaxed),
            chunks_stolen: self.chunks_stolen.load(Ordering::Relaxed),
            edges: EdgeCounts {
                read_after_write: self.edges_raw.load(Ordering::Relaxed),
                write_after_write: self.edges_waw.load(Ordering::Relaxed),
                write_after_read: self.edges_war.load(Ordering::Relaxed),
                explicit: self.edges_explicit.load(Ordering::Relaxed),
                in_order: self.edges_in_order.load(Ordering::Relaxed),
            },
            avg_latency_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_latency_ns: histogram.value_at_quantile(0.50),
            p99_latency_ns: histogram.value_at_quantile(0.99),
            max_latency_ns: histogram.max(),
            latency_samples: histogram.len(),
            shared_bytes_allocated: self.shared_bytes_allocated.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Dependency edges created so far, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeCounts {
    pub read_after_write: u64,
    pub write_after_write: u64,
    pub write_after_read: u64,
    pub explicit: u64,
    pub in_order: u64,
}

impl EdgeCounts {
    pub fn total(&self) -> u64 {
        self.read_after_write
            + self.write_after_write
            + self.write_after_read
            + self.explicit
            + self.in_order
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: Instant,
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub kernels_panicked: u64,
    pub work_items: u64,
    pub chunks_executed: u64,
    pub chunks_stolen: u64,
    pub edges: EdgeCounts,
    pub avg_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub max_latency_ns: u64,
    /// Completions recorded in the latency histogram
    pub latency_samples: u64,
    pub shared_bytes_allocated: u64,
}

impl MetricsSnapshot {
    /// Submissions that have not finished yet
    pub fn in_flight(&self) -> u64 {
        self.tasks_submitted
            .saturating_sub(self.tasks_completed + self.tasks_failed)
    }

    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        (self.tasks_completed + self.tasks_failed) as f64 / seconds
    }
}
