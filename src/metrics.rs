// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter, Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {
    Count,
    Milliseconds,
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {{
        let _ = ($name, $unit, $desc);
    }};
    ($name:expr, $desc:expr) => {{
        let _ = ($name, $desc);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {{
        let _ = ($name, $desc);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {{
        let _ = ($name, $unit, $desc);
    }};
    ($name:expr, $desc:expr) => {{
        let _ = ($name, $desc);
    }};
}

#[cfg(not(feature = "observability"))]
use crate::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter,
};

use std::time::Duration;

/// Initializes the descriptions for the exporter's own metrics.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_gauge!("exporter_up", "Exporter process liveness (1=up).");
    describe_gauge!(
        "exporter_heartbeat_unix_seconds",
        "Last heartbeat timestamp (unix seconds)."
    );
    describe_counter!(
        "exporter_rpc_calls_total",
        Unit::Count,
        "Total number of eth_call requests issued, labeled by job and outcome."
    );
    describe_histogram!(
        "exporter_rpc_call_latency_ms",
        Unit::Milliseconds,
        "eth_call latency in milliseconds, labeled by job."
    );
    describe_counter!(
        "exporter_poll_errors_total",
        Unit::Count,
        "Per-target poll failures, labeled by job and reason (rpc, timeout, decode, invalid_address)."
    );
    describe_counter!(
        "exporter_ticks_total",
        Unit::Count,
        "Completed poll cycles, labeled by job."
    );
    describe_histogram!(
        "exporter_tick_duration_ms",
        Unit::Milliseconds,
        "Duration of one full poll cycle in milliseconds, labeled by job."
    );
}

/// Describes a per-job balance family; called once per registration.
pub fn describe_balance_gauge(name: &str, help: &'static str) {
    describe_gauge!(name.to_string(), help);
}

// --- Helper functions to update metrics ---

pub fn record_rpc_call(job: &str, success: bool, duration: Duration) {
    let outcome = if success { "ok" } else { "error" };
    counter!("exporter_rpc_calls_total", 1, "job" => job.to_string(), "outcome" => outcome);
    histogram!(
        "exporter_rpc_call_latency_ms",
        duration.as_secs_f64() * 1000.0,
        "job" => job.to_string()
    );
}

pub fn increment_poll_error(job: &str, reason: &'static str) {
    counter!("exporter_poll_errors_total", 1, "job" => job.to_string(), "reason" => reason);
}

pub fn record_tick(job: &str, duration: Duration) {
    increment_counter!("exporter_ticks_total", "job" => job.to_string());
    histogram!(
        "exporter_tick_duration_ms",
        duration.as_secs_f64() * 1000.0,
        "job" => job.to_string()
    );
}

// --- Gauges & heartbeat ---

pub fn record_heartbeat() {
    gauge!("exporter_up", 1.0);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    gauge!("exporter_heartbeat_unix_seconds", ts);
}
