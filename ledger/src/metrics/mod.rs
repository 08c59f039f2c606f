//! Prometheus metrics for mining, admission, and self-healing activity.

pub mod prometheus;

pub use prometheus::{LedgerMetrics, MetricsRegistry};
