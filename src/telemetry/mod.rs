//! Telemetry for queues: counters and latency histograms.

pub mod metrics;

pub use metrics::{EdgeCounts, Metrics, MetricsSnapshot};
