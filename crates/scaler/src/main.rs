//! Predictive Scaler - forecast-driven replica management
//!
//! Runs as a Deployment next to Prometheus, forecasting request rates for
//! the configured services and adjusting their replica counts.

use anyhow::{Context, Result};
use predictive_scaler::{api, config::ScalerConfig};
use scaler_lib::{
    collector::create_metrics_source,
    controller::{ControlLoopBuilder, ScalingEngine},
    health::{components, HealthRegistry},
    observability::{ScalerMetrics, StructuredLogger},
    orchestrator::KubeOrchestrator,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SCALER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting predictive-scaler");

    let config = ScalerConfig::load().context("Failed to load configuration")?;
    if config.services.is_empty() {
        warn!("No services configured, the control loop will idle");
    }
    info!(
        namespace = %config.namespace,
        services = ?config.services,
        prometheus = %config.prometheus.url,
        "Scaler configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::METRICS_SOURCE).await;
    health_registry.register(components::ORCHESTRATOR).await;
    health_registry.register(components::CONTROL_LOOP).await;

    let metrics = ScalerMetrics::new();
    let logger = StructuredLogger::new(&config.namespace);

    let source = create_metrics_source(&config.prometheus)
        .context("Failed to create metrics source")?;
    let orchestrator = KubeOrchestrator::try_default(&config.namespace)
        .await
        .context("Failed to connect to Kubernetes")?;

    let engine = ScalingEngine::new(
        source,
        Arc::new(orchestrator),
        config.scaling.clone(),
        config.prometheus.metrics_query(),
        logger.clone(),
    )
    .context("Failed to create scaling engine")?;

    let control_loop = ControlLoopBuilder::new()
        .engine(Arc::new(engine))
        .services(config.services.clone())
        .interval(config.interval())
        .health(health_registry.clone())
        .build()
        .context("Failed to create control loop")?;

    logger.log_startup(SCALER_VERSION, &config.services, config.interval_secs);

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(control_loop.run(shutdown_rx));

    health_registry.set_ready(true).await;

    let reason = shutdown_signal().await;
    logger.log_shutdown(reason);
    health_registry.set_ready(false).await;

    // The loop finishes any in-flight passes before returning
    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        warn!(error = %e, "Control loop task ended abnormally");
    }
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT received",
        _ = terminate => "SIGTERM received",
    }
}
