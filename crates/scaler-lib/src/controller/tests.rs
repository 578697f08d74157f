//! Scenario tests for the scaling engine and control loop
//!
//! A scripted metrics source and the in-memory orchestrator stand in for
//! Prometheus and Kubernetes.

#[cfg(test)]
mod engine_scenarios {
    use crate::collector::{MetricsQuery, MetricsSource};
    use crate::controller::{ControlLoopBuilder, PassOutcome, ScalingEngine};
    use crate::error::{PassStage, Result, ScalerError};
    use crate::health::{components, ComponentStatus, HealthRegistry};
    use crate::models::{MetricSample, ScalingLimits};
    use crate::observability::StructuredLogger;
    use crate::orchestrator::{InMemoryOrchestrator, Orchestrator};
    use crate::scaling::GateVerdict;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Returns a fixed series per service, or fails for unknown ones
    #[derive(Default)]
    struct ScriptedSource {
        series: DashMap<String, Vec<(DateTime<Utc>, f64)>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn with_rates(self, service: &str, rates: &[f64]) -> Self {
            let start = Utc::now() - ChronoDuration::minutes(rates.len() as i64);
            let points = rates
                .iter()
                .enumerate()
                .map(|(i, rate)| (start + ChronoDuration::minutes(i as i64), *rate))
                .collect();
            self.series.insert(service.to_string(), points);
            self
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        async fn range_query(
            &self,
            service: &str,
            _expression: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _step: Duration,
        ) -> Result<Vec<(DateTime<Utc>, f64)>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.series
                .get(service)
                .map(|points| points.value().clone())
                .ok_or_else(|| ScalerError::MetricsUnavailable {
                    service: service.to_string(),
                    reason: "connection refused".to_string(),
                })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn ramp() -> Vec<f64> {
        (0..12).map(|i| 100.0 + 10.0 * i as f64).collect()
    }

    fn limits(threshold: f64) -> ScalingLimits {
        ScalingLimits {
            min_replicas: 2,
            max_replicas: 20,
            scale_threshold: threshold,
            cooldown_period: Duration::from_secs(300),
            min_confidence: 0.5,
        }
    }

    fn engine(
        source: ScriptedSource,
        orchestrator: Arc<InMemoryOrchestrator>,
        threshold: f64,
    ) -> ScalingEngine {
        ScalingEngine::new(
            Arc::new(source),
            orchestrator,
            limits(threshold),
            MetricsQuery::default(),
            StructuredLogger::new("test"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ramp_produces_target_four() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &ramp());
        let engine = engine(source, orchestrator.clone(), 100.0);

        match engine.run_pass("api", false).await.unwrap() {
            PassOutcome::Suppressed { decision, reason } => {
                assert_eq!(decision.current_replicas, 2);
                assert_eq!(decision.target_replicas, 4);
                assert_eq!(decision.reason, "Predicted load: 220.00");
                // Ten ramp samples have variance 825, far below the gate
                assert_eq!(decision.confidence, 0.1);
                assert!(matches!(reason, GateVerdict::LowConfidence { .. }));
            }
            other => panic!("expected suppressed decision, got {:?}", other),
        }
        assert!(orchestrator.writes().await.is_empty());
        assert_eq!(engine.history_len("api").await, 12);
    }

    #[tokio::test]
    async fn test_forced_pass_applies_and_round_trips() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &ramp());
        let engine = engine(source, orchestrator.clone(), 100.0);

        let decision = engine.evaluate("api", true).await.unwrap();
        assert_eq!(decision.target_replicas, 4);
        assert_eq!(engine.current_replicas("api").await.unwrap(), 4);
        assert_eq!(engine.last_applied("api"), Some(decision.timestamp));
    }

    #[tokio::test]
    async fn test_below_threshold_is_no_change() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 5));
        let source = ScriptedSource::default().with_rates("api", &[50.0; 12]);
        let engine = engine(source, orchestrator.clone(), 100.0);

        let outcome = engine.run_pass("api", false).await.unwrap();
        assert_eq!(
            outcome,
            PassOutcome::NoChange {
                forecast: 50.0,
                current: 5
            }
        );
        assert!(engine.evaluate("api", true).await.is_none());
        assert!(orchestrator.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_stable_load_applies_then_cools_down() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &[150.0; 12]);
        let engine = engine(source, orchestrator.clone(), 100.0);

        // Flat traffic scores the 0.9 ceiling and passes the gate
        match engine.run_pass("api", false).await.unwrap() {
            PassOutcome::Applied(decision) => {
                assert_eq!(decision.target_replicas, 3);
                assert_eq!(decision.confidence, 0.9);
            }
            other => panic!("expected applied decision, got {:?}", other),
        }

        // Same pressure right away is inside the cooldown window
        match engine.run_pass("api", false).await.unwrap() {
            PassOutcome::Suppressed { decision, reason } => {
                assert_eq!(decision.current_replicas, 3);
                assert_eq!(decision.target_replicas, 4);
                assert!(matches!(reason, GateVerdict::CoolingDown { .. }));
            }
            other => panic!("expected cooldown, got {:?}", other),
        }

        assert_eq!(orchestrator.writes().await, vec![("api".to_string(), 3)]);
        // Overlapping windows are not recorded twice
        assert_eq!(engine.history_len("api").await, 12);
    }

    #[tokio::test]
    async fn test_cold_start_uses_last_rate() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &[10.0, 400.0, 300.0]);
        let engine = engine(source, orchestrator.clone(), 100.0);

        match engine.run_pass("api", false).await.unwrap() {
            PassOutcome::Suppressed { decision, .. } => {
                assert_eq!(decision.target_replicas, 6);
                assert_eq!(decision.confidence, 0.3);
            }
            other => panic!("expected suppressed decision, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_series_is_no_metrics() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &[]);
        let engine = engine(source, orchestrator, 100.0);

        assert_eq!(
            engine.run_pass("api", false).await.unwrap(),
            PassOutcome::NoMetrics
        );
    }

    #[tokio::test]
    async fn test_empty_fetch_does_not_scale_on_old_history() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &[]);
        let engine = engine(source, orchestrator.clone(), 100.0);

        let six_hours_ago = Utc::now() - ChronoDuration::hours(6);
        let stale: Vec<MetricSample> = (0..12)
            .map(|i| MetricSample::new("api", six_hours_ago + ChronoDuration::minutes(i), 150.0))
            .collect();
        assert_eq!(engine.record("api", stale).await, 12);

        // Flat 150 rps would otherwise be applied at full confidence
        assert_eq!(
            engine.run_pass("api", false).await.unwrap(),
            PassOutcome::NoMetrics
        );
        assert!(engine.evaluate("api", true).await.is_none());
        assert!(orchestrator.writes().await.is_empty());
        assert_eq!(engine.history_len("api").await, 12);
    }

    #[tokio::test]
    async fn test_metrics_failure_stops_at_collecting() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let engine = engine(ScriptedSource::default(), orchestrator.clone(), 100.0);

        let err = engine.run_pass("api", true).await.unwrap_err();
        assert_eq!(err.stage, PassStage::Collecting);
        assert!(matches!(err.source, ScalerError::MetricsUnavailable { .. }));
        assert!(engine.evaluate("api", true).await.is_none());
        assert!(orchestrator.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_workload_fails_at_deciding() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new());
        let source = ScriptedSource::default().with_rates("ghost", &ramp());
        let engine = engine(source, orchestrator, 100.0);

        let err = engine.run_pass("ghost", true).await.unwrap_err();
        assert_eq!(err.stage, PassStage::Deciding);
        assert!(matches!(err.source, ScalerError::ServiceNotFound { .. }));
        assert!(matches!(
            engine.current_replicas("ghost").await,
            Err(ScalerError::ServiceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_failure_is_apply_failed() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        orchestrator.set_failing_writes(true);
        let source = ScriptedSource::default().with_rates("api", &ramp());
        let engine = engine(source, orchestrator.clone(), 100.0);

        let outcome = engine.run_pass("api", true).await.unwrap();
        assert!(matches!(outcome, PassOutcome::ApplyFailed(_)));
        assert!(engine.last_applied("api").is_none());

        // The next pass converges once the orchestrator recovers
        orchestrator.set_failing_writes(false);
        assert!(engine.evaluate("api", true).await.is_some());
        assert_eq!(orchestrator.get_replica_count("api").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_passes_are_serialized() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = ScriptedSource::default().with_rates("api", &[150.0; 12]);
        let engine = Arc::new(engine(source, orchestrator.clone(), 100.0));

        let (a, b) = tokio::join!(engine.run_pass("api", true), engine.run_pass("api", true));
        assert!(matches!(a, Ok(PassOutcome::Applied(_))));
        assert!(matches!(b, Ok(PassOutcome::Applied(_))));

        // The second pass sees the first pass's write
        assert_eq!(
            orchestrator.writes().await,
            vec![("api".to_string(), 3), ("api".to_string(), 4)]
        );
    }

    #[tokio::test]
    async fn test_record_and_window() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new());
        let engine = engine(ScriptedSource::default(), orchestrator, 100.0);

        let now = Utc::now();
        let samples: Vec<MetricSample> = (0..5)
            .map(|i| MetricSample::new("api", now + ChronoDuration::seconds(i), i as f64))
            .collect();
        assert_eq!(engine.record("api", samples.clone()).await, 5);
        assert_eq!(engine.record("api", samples).await, 0);

        let window = engine.window("api", 2).await;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].request_rate, 3.0);
        assert_eq!(window[1].request_rate, 4.0);
    }

    #[tokio::test]
    async fn test_invalid_limits_rejected() {
        let result = ScalingEngine::new(
            Arc::new(ScriptedSource::default()),
            Arc::new(InMemoryOrchestrator::new()),
            ScalingLimits {
                min_replicas: 9,
                max_replicas: 3,
                ..ScalingLimits::default()
            },
            MetricsQuery::default(),
            StructuredLogger::new("test"),
        );
        assert!(matches!(result, Err(ScalerError::InvalidLimits(_))));
    }

    #[tokio::test]
    async fn test_run_once_isolates_failures() {
        let orchestrator = Arc::new(
            InMemoryOrchestrator::new()
                .with_service("api", 2)
                .with_service("billing", 5),
        );
        let source = ScriptedSource::default()
            .with_rates("api", &[150.0; 12])
            .with_rates("billing", &[50.0; 12]);
        let engine = Arc::new(engine(source, orchestrator.clone(), 100.0));
        let health = HealthRegistry::new();

        let control = ControlLoopBuilder::new()
            .engine(engine)
            .services(["api", "billing", "search"])
            .health(health.clone())
            .build()
            .unwrap();

        let summary = control.run_once().await;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.collect_errors, 1);

        let report = health.health().await;
        assert_eq!(
            report.components[components::METRICS_SOURCE].status,
            ComponentStatus::Degraded
        );
        assert_eq!(
            report.components[components::ORCHESTRATOR].status,
            ComponentStatus::Healthy
        );
        assert_eq!(orchestrator.get_replica_count("api").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_builder_requires_engine() {
        assert!(ControlLoopBuilder::new().services(["api"]).build().is_err());
    }

    #[tokio::test]
    async fn test_loop_runs_until_shutdown() {
        let orchestrator = Arc::new(InMemoryOrchestrator::new().with_service("api", 2));
        let source = Arc::new(ScriptedSource::default().with_rates("api", &[150.0; 12]));
        let engine = Arc::new(
            ScalingEngine::new(
                source.clone(),
                orchestrator.clone(),
                limits(100.0),
                MetricsQuery::default(),
                StructuredLogger::new("test"),
            )
            .unwrap(),
        );

        let control = ControlLoopBuilder::new()
            .engine(engine)
            .services(["api"])
            .interval(Duration::from_millis(20))
            .build()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(control.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(source.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(orchestrator.writes().await, vec![("api".to_string(), 3)]);
    }
}
