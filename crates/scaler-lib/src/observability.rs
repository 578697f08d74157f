//! Observability infrastructure for the predictive scaler
//!
//! Provides:
//! - Prometheus metrics (pass latency, forecasts, confidence, replica counts, decision outcomes)
//! - Structured JSON logging with tracing

use crate::models::ScalingDecision;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, GaugeVec, Histogram, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for pass latency (in seconds)
const PASS_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ScalerMetricsInner> = OnceLock::new();

struct ScalerMetricsInner {
    pass_latency_seconds: Histogram,
    forecast_rps: GaugeVec,
    confidence: GaugeVec,
    replicas: IntGaugeVec,
    decisions_total: IntCounterVec,
    pass_errors_total: IntCounterVec,
    services_monitored: IntGauge,
}

impl ScalerMetricsInner {
    fn new() -> Self {
        Self {
            pass_latency_seconds: register_histogram!(
                "predictive_scaler_pass_latency_seconds",
                "Time spent on one collect-forecast-decide-execute pass for a service",
                PASS_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_latency_seconds"),

            forecast_rps: register_gauge_vec!(
                "predictive_scaler_forecast_requests_per_second",
                "Most recent one-step-ahead request rate forecast",
                &["service"]
            )
            .expect("Failed to register forecast_requests_per_second"),

            confidence: register_gauge_vec!(
                "predictive_scaler_confidence",
                "Confidence attached to the most recent decision",
                &["service"]
            )
            .expect("Failed to register confidence"),

            replicas: register_int_gauge_vec!(
                "predictive_scaler_replicas",
                "Replica counts observed and targeted by the scaler",
                &["service", "kind"]
            )
            .expect("Failed to register replicas"),

            decisions_total: register_int_counter_vec!(
                "predictive_scaler_decisions_total",
                "Scaling pass outcomes by service",
                &["service", "outcome"]
            )
            .expect("Failed to register decisions_total"),

            pass_errors_total: register_int_counter_vec!(
                "predictive_scaler_pass_errors_total",
                "Failed passes by the stage at which they failed",
                &["stage"]
            )
            .expect("Failed to register pass_errors_total"),

            services_monitored: register_int_gauge!(
                "predictive_scaler_services_monitored",
                "Number of services evaluated by the control loop"
            )
            .expect("Failed to register services_monitored"),
        }
    }
}

/// Scaler metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ScalerMetrics {
    _private: (),
}

impl Default for ScalerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ScalerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ScalerMetricsInner {
        GLOBAL_METRICS.get_or_init(ScalerMetricsInner::new)
    }

    pub fn observe_pass_latency(&self, duration_secs: f64) {
        self.inner().pass_latency_seconds.observe(duration_secs);
    }

    pub fn set_forecast(&self, service: &str, forecast: f64) {
        self.inner()
            .forecast_rps
            .with_label_values(&[service])
            .set(forecast);
    }

    pub fn set_confidence(&self, service: &str, confidence: f64) {
        self.inner()
            .confidence
            .with_label_values(&[service])
            .set(confidence);
    }

    pub fn set_current_replicas(&self, service: &str, replicas: u32) {
        self.inner()
            .replicas
            .with_label_values(&[service, "current"])
            .set(i64::from(replicas));
    }

    pub fn set_target_replicas(&self, service: &str, replicas: u32) {
        self.inner()
            .replicas
            .with_label_values(&[service, "target"])
            .set(i64::from(replicas));
    }

    /// Count one pass outcome (`applied`, `suppressed_confidence`, ...)
    pub fn inc_decision(&self, service: &str, outcome: &str) {
        self.inner()
            .decisions_total
            .with_label_values(&[service, outcome])
            .inc();
    }

    pub fn inc_pass_error(&self, stage: &str) {
        self.inner()
            .pass_errors_total
            .with_label_values(&[stage])
            .inc();
    }

    pub fn set_services_monitored(&self, count: i64) {
        self.inner().services_monitored.set(count);
    }

    pub fn decision_count(&self, service: &str, outcome: &str) -> u64 {
        self.inner()
            .decisions_total
            .with_label_values(&[service, outcome])
            .get()
    }
}

/// Structured logger for scaler events
///
/// Provides consistent JSON-formatted logging for decisions, applied and
/// suppressed actions, and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    namespace: String,
}

impl StructuredLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn log_decision(&self, decision: &ScalingDecision, forecast: f64, forced: bool) {
        info!(
            event = "scaling_decision",
            namespace = %self.namespace,
            service = %decision.service,
            current_replicas = decision.current_replicas,
            target_replicas = decision.target_replicas,
            forecast = forecast,
            confidence = decision.confidence,
            forced = forced,
            reason = %decision.reason,
            "Scaling decision produced"
        );
    }

    pub fn log_applied(&self, decision: &ScalingDecision) {
        info!(
            event = "scaling_applied",
            namespace = %self.namespace,
            service = %decision.service,
            from = decision.current_replicas,
            to = decision.target_replicas,
            "Scaling decision applied"
        );
    }

    pub fn log_apply_failed(&self, decision: &ScalingDecision) {
        warn!(
            event = "scaling_failed",
            namespace = %self.namespace,
            service = %decision.service,
            target_replicas = decision.target_replicas,
            "Scaling decision could not be applied, retrying next pass"
        );
    }

    pub fn log_suppressed(&self, decision: &ScalingDecision, reason: &str) {
        info!(
            event = "scaling_suppressed",
            namespace = %self.namespace,
            service = %decision.service,
            target_replicas = decision.target_replicas,
            confidence = decision.confidence,
            reason = %reason,
            "Scaling decision suppressed"
        );
    }

    pub fn log_pass_failed(&self, service: &str, stage: &str, error: &dyn std::error::Error) {
        error!(
            event = "pass_failed",
            namespace = %self.namespace,
            service = %service,
            stage = %stage,
            error = %error,
            "Scaling pass failed"
        );
    }

    pub fn log_startup(&self, version: &str, services: &[String], interval_secs: u64) {
        info!(
            event = "scaler_started",
            namespace = %self.namespace,
            scaler_version = %version,
            services = ?services,
            interval_secs = interval_secs,
            "Predictive scaler started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "scaler_shutdown",
            namespace = %self.namespace,
            reason = %reason,
            "Predictive scaler shutting down"
        );
    }
}
