//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the processor's metrics (streams, messages, short-circuits, errors)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `ext_proc_streams_total` (counter): streams opened
//! - `ext_proc_streams_active` (gauge): streams currently open
//! - `ext_proc_messages_total` (counter): phase messages received, by phase
//! - `ext_proc_immediate_responses_total` (counter): short-circuits, by phase
//!   and processor
//! - `ext_proc_stream_errors_total` (counter): abnormal terminations, by kind
//! - `ext_proc_phase_duration_seconds` (histogram): receive-to-reply time, by
//!   phase
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests free of global state
//! - The exporter owns its own HTTP listener

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::processing::Phase;

/// Install the Prometheus recorder and start its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_stream_opened() {
    metrics::counter!("ext_proc_streams_total").increment(1);
    metrics::gauge!("ext_proc_streams_active").increment(1.0);
}

pub fn record_stream_closed() {
    metrics::gauge!("ext_proc_streams_active").decrement(1.0);
}

pub fn record_message(phase: Phase) {
    metrics::counter!("ext_proc_messages_total", "phase" => phase.as_str()).increment(1);
}

pub fn record_immediate_response(phase: Phase, processor: &str) {
    metrics::counter!(
        "ext_proc_immediate_responses_total",
        "phase" => phase.as_str(),
        "processor" => processor.to_string()
    )
    .increment(1);
}

pub fn record_stream_error(kind: &'static str) {
    metrics::counter!("ext_proc_stream_errors_total", "kind" => kind).increment(1);
}

pub fn record_phase_duration(phase: Phase, elapsed: Duration) {
    metrics::histogram!("ext_proc_phase_duration_seconds", "phase" => phase.as_str())
        .record(elapsed.as_secs_f64());
}
