//! Error taxonomy for the scaling engine
//!
//! Every variant is recoverable at the control-loop boundary: a failing
//! service is skipped for the current pass and retried on the next one.
//! Insufficient history and degenerate regressions are not errors; the
//! forecaster handles them as ordinary branches.

use std::fmt;
use thiserror::Error;

/// Errors raised by the engine's external capabilities
#[derive(Debug, Error)]
pub enum ScalerError {
    /// Metrics backend unreachable or returned a non-success status
    #[error("metrics unavailable for '{service}': {reason}")]
    MetricsUnavailable { service: String, reason: String },

    /// Metrics backend answered but the response could not be used
    #[error("metrics query failed for '{service}': {reason}")]
    QueryError { service: String, reason: String },

    /// The orchestrator has no workload with this name
    #[error("service '{service}' not found")]
    ServiceNotFound { service: String },

    /// Reading the current replica count failed
    #[error("failed to read replicas for '{service}': {reason}")]
    OrchestratorRead { service: String, reason: String },

    /// Setting the replica count failed
    #[error("failed to scale '{service}': {reason}")]
    OrchestratorWrite { service: String, reason: String },

    /// Static scaling limits are inconsistent
    #[error("invalid scaling limits: {0}")]
    InvalidLimits(String),

    /// Engine wiring or configuration problem
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScalerError>;

/// Stage of a pass, in state-machine order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassStage {
    Collecting,
    Forecasting,
    Deciding,
    Gating,
    Executing,
}

impl PassStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStage::Collecting => "collecting",
            PassStage::Forecasting => "forecasting",
            PassStage::Deciding => "deciding",
            PassStage::Gating => "gating",
            PassStage::Executing => "executing",
        }
    }
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pass that failed at a specific stage
#[derive(Debug, Error)]
#[error("pass failed while {stage}: {source}")]
pub struct PassError {
    pub stage: PassStage,
    #[source]
    pub source: ScalerError,
}

impl PassError {
    pub fn new(stage: PassStage, source: ScalerError) -> Self {
        Self { stage, source }
    }
}
