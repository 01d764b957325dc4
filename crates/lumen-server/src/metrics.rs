//! Metrics collection and export for Lumen.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use lumen_core::{ActuatorState, StateObserver};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const SESSIONS_TOTAL: &str = "lumen_sessions_total";
    pub const SESSIONS_ACTIVE: &str = "lumen_sessions_active";
    pub const FRAMES_TOTAL: &str = "lumen_frames_total";
    pub const FRAMES_BYTES: &str = "lumen_frames_bytes";
    pub const STATE_CHANGES_TOTAL: &str = "lumen_state_changes_total";
    pub const STATE_REVISION: &str = "lumen_state_revision";
    pub const ACTUATOR_ON: &str = "lumen_actuator_on";
    pub const SESSION_SECONDS: &str = "lumen_session_seconds";
    pub const ERRORS_TOTAL: &str = "lumen_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::SESSIONS_TOTAL,
        "Total number of sessions since server start"
    );
    metrics::describe_gauge!(names::SESSIONS_ACTIVE, "Current number of live sessions");
    metrics::describe_counter!(names::FRAMES_TOTAL, "Total number of frames by direction");
    metrics::describe_counter!(names::FRAMES_BYTES, "Total bytes of frames by direction");
    metrics::describe_counter!(
        names::STATE_CHANGES_TOTAL,
        "Total number of actuator writes"
    );
    metrics::describe_gauge!(names::STATE_REVISION, "Version of the actuator state");
    metrics::describe_gauge!(names::ACTUATOR_ON, "1 when the actuator is on");
    metrics::describe_histogram!(names::SESSION_SECONDS, "Session lifetime in seconds");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a frame.
pub fn record_frame(bytes: usize, direction: &'static str) {
    counter!(names::FRAMES_TOTAL, "direction" => direction).increment(1);
    counter!(names::FRAMES_BYTES, "direction" => direction).increment(bytes as u64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard for one session: counts it on creation, records its
/// lifetime on drop.
pub struct SessionMetricsGuard {
    started: std::time::Instant,
}

impl SessionMetricsGuard {
    /// Create a new metrics guard, recording a session.
    #[must_use]
    pub fn new() -> Self {
        counter!(names::SESSIONS_TOTAL).increment(1);
        gauge!(names::SESSIONS_ACTIVE).increment(1.0);
        Self {
            started: std::time::Instant::now(),
        }
    }
}

impl Default for SessionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::SESSIONS_ACTIVE).decrement(1.0);
        histogram!(names::SESSION_SECONDS).record(self.started.elapsed().as_secs_f64());
    }
}

/// Publishes actuator writes as metrics.
#[derive(Debug, Default)]
pub struct MetricsObserver;

impl StateObserver for MetricsObserver {
    fn state_changed(&mut self, state: ActuatorState) {
        counter!(names::STATE_CHANGES_TOTAL).increment(1);
        gauge!(names::STATE_REVISION).set(state.version as f64);
        gauge!(names::ACTUATOR_ON).set(if state.value { 1.0 } else { 0.0 });
    }
}
