//! Scheduled control loop
//!
//! Every tick evaluates all configured services concurrently, one task per
//! service, and waits for the whole batch before reporting health.

use super::{PassOutcome, ScalingEngine};
use crate::error::{PassStage, Result, ScalerError};
use crate::health::{components, HealthRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Configuration for the control loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Time between ticks (default: 60 seconds)
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Tally of one tick
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub total: usize,
    pub applied: usize,
    pub suppressed: usize,
    pub no_change: usize,
    pub no_metrics: usize,
    pub apply_failed: usize,
    /// Passes that failed while querying the metrics source
    pub collect_errors: usize,
    /// Passes that failed while reading the replica count
    pub orchestrator_errors: usize,
    /// Passes whose task panicked or was cancelled
    pub task_errors: usize,
}

impl PassSummary {
    fn record(&mut self, result: std::result::Result<PassOutcome, PassStage>) {
        match result {
            Ok(PassOutcome::Applied(_)) => self.applied += 1,
            Ok(PassOutcome::Suppressed { .. }) => self.suppressed += 1,
            Ok(PassOutcome::NoChange { .. }) => self.no_change += 1,
            Ok(PassOutcome::NoMetrics) => self.no_metrics += 1,
            Ok(PassOutcome::ApplyFailed(_)) => self.apply_failed += 1,
            Err(PassStage::Collecting) => self.collect_errors += 1,
            Err(_) => self.orchestrator_errors += 1,
        }
    }
}

pub struct ControlLoop {
    engine: Arc<ScalingEngine>,
    services: Vec<String>,
    config: LoopConfig,
    health: Option<HealthRegistry>,
}

impl ControlLoop {
    pub fn new(
        engine: Arc<ScalingEngine>,
        services: Vec<String>,
        config: LoopConfig,
        health: Option<HealthRegistry>,
    ) -> Self {
        Self {
            engine,
            services,
            config,
            health,
        }
    }

    /// Tick until a shutdown signal arrives.
    ///
    /// The signal is only observed between ticks, so passes already in
    /// flight finish before this returns.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            services = self.services.len(),
            "Starting scaling control loop"
        );

        self.engine
            .metrics()
            .set_services_monitored(self.services.len() as i64);

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let summary = self.run_once().await;
                    info!(
                        services = summary.total,
                        applied = summary.applied,
                        suppressed = summary.suppressed,
                        no_change = summary.no_change,
                        errors = summary.collect_errors + summary.orchestrator_errors + summary.task_errors,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Control loop tick complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down scaling control loop");
                    break;
                }
            }
        }
    }

    /// Evaluate every configured service once
    pub async fn run_once(&self) -> PassSummary {
        let mut summary = PassSummary {
            total: self.services.len(),
            ..PassSummary::default()
        };

        let mut tasks = JoinSet::new();
        for service in &self.services {
            let engine = self.engine.clone();
            let service = service.clone();
            tasks.spawn(async move {
                engine
                    .run_pass(&service, false)
                    .await
                    .map_err(|e| e.stage)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => summary.record(result),
                Err(e) => {
                    error!(error = %e, "Scaling pass task failed");
                    summary.task_errors += 1;
                }
            }
        }

        debug!(?summary, "Pass summary");
        self.report_health(&summary).await;
        summary
    }

    async fn report_health(&self, summary: &PassSummary) {
        let Some(health) = &self.health else {
            return;
        };
        health
            .record_failures(components::METRICS_SOURCE, summary.collect_errors, summary.total)
            .await;
        health
            .record_failures(
                components::ORCHESTRATOR,
                summary.orchestrator_errors + summary.apply_failed,
                summary.total,
            )
            .await;
        health
            .record_failures(components::CONTROL_LOOP, summary.task_errors, summary.total)
            .await;
    }
}

/// Builder for creating the control loop
pub struct ControlLoopBuilder {
    engine: Option<Arc<ScalingEngine>>,
    services: Vec<String>,
    config: LoopConfig,
    health: Option<HealthRegistry>,
}

impl ControlLoopBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            services: Vec::new(),
            config: LoopConfig::default(),
            health: None,
        }
    }

    pub fn engine(mut self, engine: Arc<ScalingEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the monitored services; duplicates are dropped
    pub fn services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut services: Vec<String> = services.into_iter().map(Into::into).collect();
        services.sort();
        services.dedup();
        self.services = services;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Report per-tick results to a health registry
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<ControlLoop> {
        let engine = self
            .engine
            .ok_or_else(|| ScalerError::Config("engine is required".to_string()))?;
        if self.config.interval.is_zero() {
            return Err(ScalerError::Config(
                "loop interval must be greater than zero".to_string(),
            ));
        }

        Ok(ControlLoop::new(
            engine,
            self.services,
            self.config,
            self.health,
        ))
    }
}

impl Default for ControlLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
