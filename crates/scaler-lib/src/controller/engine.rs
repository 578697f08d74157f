//! Per-service scaling pass
//!
//! One pass walks a single service through collecting, forecasting,
//! deciding, gating and executing. Each service has its own lock, held
//! for the whole pass, so a manual evaluation and a scheduled one never
//! interleave on the same history or last-applied time.

use crate::collector::{fetch_samples, MetricsQuery, MetricsSource};
use crate::error::{PassError, PassStage, Result};
use crate::models::{MetricSample, ScalingDecision, ScalingLimits};
use crate::observability::{ScalerMetrics, StructuredLogger};
use crate::orchestrator::Orchestrator;
use crate::predictor::{ConfidenceScorer, Forecaster, ServiceHistory, TrendForecaster};
use crate::scaling::{CooldownGate, GateVerdict, LastActions, ScalingExecutor, ScalingPolicy};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

/// How a pass ended when nothing failed
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// The metrics source returned no samples this pass
    NoMetrics,
    /// The policy target equals the current replica count
    NoChange { forecast: f64, current: u32 },
    /// The gate rejected the decision
    Suppressed {
        decision: ScalingDecision,
        reason: GateVerdict,
    },
    Applied(ScalingDecision),
    /// The orchestrator rejected the write; the next pass re-evaluates
    ApplyFailed(ScalingDecision),
}

impl PassOutcome {
    /// Label used in the decisions counter
    pub fn as_str(&self) -> &'static str {
        match self {
            PassOutcome::NoMetrics => "no_metrics",
            PassOutcome::NoChange { .. } => "no_change",
            PassOutcome::Suppressed { reason, .. } => reason.as_str(),
            PassOutcome::Applied(_) => "applied",
            PassOutcome::ApplyFailed(_) => "failed",
        }
    }
}

/// The predictive scaling decision engine
pub struct ScalingEngine {
    source: Arc<dyn MetricsSource>,
    orchestrator: Arc<dyn Orchestrator>,
    query: MetricsQuery,
    forecaster: TrendForecaster,
    scorer: ConfidenceScorer,
    policy: ScalingPolicy,
    gate: CooldownGate,
    executor: ScalingExecutor,
    histories: DashMap<String, Arc<Mutex<ServiceHistory>>>,
    metrics: ScalerMetrics,
    logger: StructuredLogger,
}

impl ScalingEngine {
    /// Wire an engine; fails when `limits` do not validate
    pub fn new(
        source: Arc<dyn MetricsSource>,
        orchestrator: Arc<dyn Orchestrator>,
        limits: ScalingLimits,
        query: MetricsQuery,
        logger: StructuredLogger,
    ) -> Result<Self> {
        let last_actions = Arc::new(LastActions::new());
        let gate = CooldownGate::new(
            limits.min_confidence,
            limits.cooldown_period,
            last_actions.clone(),
        );
        let executor = ScalingExecutor::new(orchestrator.clone(), last_actions);
        let policy = ScalingPolicy::new(limits)?;

        Ok(Self {
            source,
            orchestrator,
            query,
            forecaster: TrendForecaster::new(),
            scorer: ConfidenceScorer::new(),
            policy,
            gate,
            executor,
            histories: DashMap::new(),
            metrics: ScalerMetrics::new(),
            logger,
        })
    }

    fn history_for(&self, service: &str) -> Arc<Mutex<ServiceHistory>> {
        self.histories
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ServiceHistory::new())))
            .value()
            .clone()
    }

    /// Run one full pass for `service`. `force` bypasses the gate.
    pub async fn run_pass(
        &self,
        service: &str,
        force: bool,
    ) -> std::result::Result<PassOutcome, PassError> {
        let history = self.history_for(service);
        let mut history = history.lock().await;

        let started = Instant::now();
        let result = self.pass(service, force, &mut history).await;
        self.metrics
            .observe_pass_latency(started.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                if !matches!(outcome, PassOutcome::NoMetrics) {
                    self.metrics.inc_decision(service, outcome.as_str());
                }
            }
            Err(e) => {
                self.metrics.inc_pass_error(e.stage.as_str());
                self.logger.log_pass_failed(service, e.stage.as_str(), e);
            }
        }

        result
    }

    async fn pass(
        &self,
        service: &str,
        force: bool,
        history: &mut ServiceHistory,
    ) -> std::result::Result<PassOutcome, PassError> {
        let samples = fetch_samples(self.source.as_ref(), &self.query, service, Utc::now())
            .await
            .map_err(|e| PassError::new(PassStage::Collecting, e))?;
        // Older history alone never drives a decision
        if samples.is_empty() {
            debug!(service = %service, "No samples returned, skipping pass");
            return Ok(PassOutcome::NoMetrics);
        }
        let accepted = history.record(samples);
        debug!(service = %service, accepted, total = history.len(), "Recorded samples");

        let forecast = self.forecaster.forecast(history);
        let confidence = self.scorer.score(history);
        self.metrics.set_forecast(service, forecast);
        self.metrics.set_confidence(service, confidence);

        let current = self
            .orchestrator
            .get_replica_count(service)
            .await
            .map_err(|e| PassError::new(PassStage::Deciding, e))?;
        self.metrics.set_current_replicas(service, current);

        let decision = match self
            .policy
            .decide(service, forecast, current, confidence, Utc::now())
        {
            Some(decision) => decision,
            None => {
                debug!(service = %service, forecast, current, "No scaling needed");
                return Ok(PassOutcome::NoChange { forecast, current });
            }
        };
        self.metrics
            .set_target_replicas(service, decision.target_replicas);
        self.logger.log_decision(&decision, forecast, force);

        if !force {
            let verdict = self.gate.check(&decision);
            if !verdict.is_approved() {
                self.logger.log_suppressed(&decision, &verdict.to_string());
                return Ok(PassOutcome::Suppressed {
                    decision,
                    reason: verdict,
                });
            }
        }

        if self.executor.apply(&decision).await {
            self.logger.log_applied(&decision);
            Ok(PassOutcome::Applied(decision))
        } else {
            self.logger.log_apply_failed(&decision);
            Ok(PassOutcome::ApplyFailed(decision))
        }
    }

    /// On-demand evaluation; returns the decision only when it was applied
    pub async fn evaluate(&self, service: &str, force: bool) -> Option<ScalingDecision> {
        match self.run_pass(service, force).await {
            Ok(PassOutcome::Applied(decision)) => Some(decision),
            _ => None,
        }
    }

    pub async fn current_replicas(&self, service: &str) -> Result<u32> {
        self.orchestrator.get_replica_count(service).await
    }

    /// Append samples to a service's history outside of a pass
    pub async fn record(&self, service: &str, samples: Vec<MetricSample>) -> usize {
        self.history_for(service).lock().await.record(samples)
    }

    /// The most recent `n` samples for a service, oldest first
    pub async fn window(&self, service: &str, n: usize) -> Vec<MetricSample> {
        self.history_for(service)
            .lock()
            .await
            .window(n)
            .cloned()
            .collect()
    }

    pub async fn history_len(&self, service: &str) -> usize {
        match self.histories.get(service).map(|h| h.value().clone()) {
            Some(history) => history.lock().await.len(),
            None => 0,
        }
    }

    pub fn last_applied(&self, service: &str) -> Option<DateTime<Utc>> {
        self.gate.last_applied(service)
    }

    pub fn metrics(&self) -> &ScalerMetrics {
        &self.metrics
    }
}
