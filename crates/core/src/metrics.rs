//! Metrics definitions for the federation layer.
//!
//! This module defines all metrics used throughout the server.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "ddm_operations_total",
        "Total number of distributed model operations by kind"
    );
    describe_counter!(
        "ddm_fanout_calls_total",
        "Total number of per-adapter sub-calls issued during fan-outs"
    );
    describe_counter!(
        "adapter_errors_total",
        "Total number of per-adapter failures collected during fan-outs"
    );
    describe_histogram!(
        "ddm_fanout_duration_seconds",
        "Wall time of a complete fan-out (all adapters settled) in seconds"
    );
}

/// Record one distributed operation.
///
/// # Arguments
/// * `operation` - The operation kind ("countRecords", "readAllCursor", ...)
/// * `model` - The logical model name
pub fn record_operation(operation: &str, model: &str) {
    counter!("ddm_operations_total", "operation" => operation.to_string(), "model" => model.to_string())
        .increment(1);
}

/// Record the number of sub-calls issued by one fan-out.
pub fn record_fanout_calls(count: u64) {
    counter!("ddm_fanout_calls_total").increment(count);
}

/// Record a collected per-adapter failure.
///
/// # Arguments
/// * `adapter` - The failing adapter's name
/// * `kind` - The failure classification
pub fn record_adapter_error(adapter: &str, kind: &str) {
    counter!("adapter_errors_total", "adapter" => adapter.to_string(), "kind" => kind.to_string())
        .increment(1);
}

/// Record fan-out duration.
pub fn record_fanout_duration(duration_secs: f64) {
    histogram!("ddm_fanout_duration_seconds").record(duration_secs);
}

/// A timer that automatically records fan-out duration when dropped.
pub struct FanoutTimer {
    start: Instant,
}

impl FanoutTimer {
    /// Start a new fan-out timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for FanoutTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FanoutTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_fanout_duration(duration);
    }
}
