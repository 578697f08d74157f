//! Load metrics collection
//!
//! The engine only consumes a "range query" capability: given a service and
//! a query expression, return the `(timestamp, value)` points observed over
//! a window. `PrometheusSource` is the production backend.

mod prometheus;


pub use self::prometheus::{PrometheusConfig, PrometheusSource};

use crate::error::{Result, ScalerError};
use crate::models::MetricSample;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub use async_trait::async_trait;

/// Placeholder substituted with the service name in query templates
pub const SERVICE_PLACEHOLDER: &str = "{service}";

/// Trait for metrics backends
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Points for `expression` over `[start, end]` at `step` resolution,
    /// ordered by timestamp.
    ///
    /// Fails with `MetricsUnavailable` when the backend cannot be reached
    /// and `QueryError` when its answer is unusable.
    async fn range_query(
        &self,
        service: &str,
        expression: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<(DateTime<Utc>, f64)>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// What to ask the metrics backend for on every pass
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsQuery {
    /// Expression template; `{service}` is replaced with the service name
    pub template: String,
    pub lookback: Duration,
    pub step: Duration,
}

impl Default for MetricsQuery {
    fn default() -> Self {
        Self {
            template: r#"rate(http_requests_total{service="{service}"}[5m])"#.to_string(),
            lookback: Duration::from_secs(60 * 60),
            step: Duration::from_secs(60),
        }
    }
}

impl MetricsQuery {
    pub fn expression_for(&self, service: &str) -> String {
        self.template.replace(SERVICE_PLACEHOLDER, service)
    }

    /// The `[now - lookback, now]` window
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        chrono::Duration::from_std(self.lookback)
            .ok()
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .map(|start| (start, now))
            .ok_or_else(|| {
                ScalerError::Config(format!(
                    "lookback {} is out of range",
                    humantime::format_duration(self.lookback)
                ))
            })
    }

    /// Reject a zero step or a lookback that cannot form a window
    pub fn validate(&self) -> Result<()> {
        if self.step.is_zero() {
            return Err(ScalerError::Config("step must be greater than zero".into()));
        }
        if self.lookback < self.step {
            return Err(ScalerError::Config(format!(
                "lookback {} is shorter than step {}",
                humantime::format_duration(self.lookback),
                humantime::format_duration(self.step)
            )));
        }
        self.window(Utc::now()).map(|_| ())
    }
}

/// Run the range query for one service and wrap the points as samples
pub async fn fetch_samples(
    source: &dyn MetricsSource,
    query: &MetricsQuery,
    service: &str,
    now: DateTime<Utc>,
) -> Result<Vec<MetricSample>> {
    let (start, end) = query.window(now)?;
    let expression = query.expression_for(service);

    let points = source
        .range_query(service, &expression, start, end, query.step)
        .await?;

    tracing::debug!(
        service = %service,
        source = source.name(),
        points = points.len(),
        "Fetched load metrics"
    );

    Ok(points
        .into_iter()
        .map(|(timestamp, rate)| MetricSample::new(service, timestamp, rate))
        .collect())
}

/// Create the Prometheus-backed metrics source
pub fn create_metrics_source(config: &PrometheusConfig) -> Result<Arc<dyn MetricsSource>> {
    tracing::info!(url = %config.url, "Using Prometheus metrics source");
    Ok(Arc::new(PrometheusSource::new(config)?))
}
