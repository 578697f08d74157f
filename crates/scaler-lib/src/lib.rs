//! Predictive scaling engine
//!
//! This crate provides the core functionality for:
//! - Load metrics collection from Prometheus
//! - Request-rate forecasting and confidence scoring
//! - Replica target computation, cooldown gating and execution
//! - A per-service control loop over a Kubernetes orchestrator
//! - Health checks and observability

pub mod collector;
pub mod controller;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod predictor;
pub mod scaling;

pub use collector::{MetricsQuery, MetricsSource, PrometheusConfig, PrometheusSource};
pub use controller::{ControlLoop, ControlLoopBuilder, PassOutcome, ScalingEngine};
pub use error::{PassError, PassStage, ScalerError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ScalerMetrics, StructuredLogger};
pub use orchestrator::{InMemoryOrchestrator, KubeOrchestrator, Orchestrator};
