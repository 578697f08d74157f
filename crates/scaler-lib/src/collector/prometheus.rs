//! Prometheus HTTP API backend
//!
//! Issues `GET /api/v1/query_range` and folds the returned matrix into a
//! single service-level series. When the expression yields one series per
//! pod, values sharing a timestamp are summed.

use super::{MetricsQuery, MetricsSource};
use crate::error::{Result, ScalerError};
use crate::models::duration_str;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const QUERY_RANGE_PATH: &str = "api/v1/query_range";

/// Connection and query settings for Prometheus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Query template, `{service}` is substituted per pass
    #[serde(default = "default_query")]
    pub query: String,

    #[serde(default = "default_lookback", with = "duration_str")]
    pub lookback: Duration,

    #[serde(default = "default_step", with = "duration_str")]
    pub step: Duration,

    #[serde(default = "default_timeout", with = "duration_str")]
    pub timeout: Duration,
}

fn default_url() -> String {
    "http://prometheus:9090".to_string()
}

fn default_query() -> String {
    MetricsQuery::default().template
}

fn default_lookback() -> Duration {
    MetricsQuery::default().lookback
}

fn default_step() -> Duration {
    MetricsQuery::default().step
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            query: default_query(),
            lookback: default_lookback(),
            step: default_step(),
            timeout: default_timeout(),
        }
    }
}

impl PrometheusConfig {
    pub fn metrics_query(&self) -> MetricsQuery {
        MetricsQuery {
            template: self.query.clone(),
            lookback: self.lookback,
            step: self.step,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryRangeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRangeData {
    result_type: String,
    #[serde(default)]
    result: Vec<RangeSeries>,
}

#[derive(Debug, Deserialize)]
struct RangeSeries {
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Metrics source backed by the Prometheus range-query API
pub struct PrometheusSource {
    client: Client,
    base_url: Url,
}

impl PrometheusSource {
    pub fn new(config: &PrometheusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScalerError::Config(format!("failed to create HTTP client: {}", e)))?;

        // Url::join replaces the last path segment unless it ends in '/'
        let mut raw = config.url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .map_err(|e| ScalerError::Config(format!("invalid Prometheus URL '{}': {}", config.url, e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, service: &str) -> Result<Url> {
        self.base_url
            .join(QUERY_RANGE_PATH)
            .map_err(|e| ScalerError::QueryError {
                service: service.to_string(),
                reason: format!("invalid query URL: {}", e),
            })
    }
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn range_query(
        &self,
        service: &str,
        expression: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let url = self.endpoint(service)?;
        let params = [
            ("query", expression.to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("step", step.as_secs().max(1).to_string()),
        ];

        let unavailable = |reason: String| ScalerError::MetricsUnavailable {
            service: service.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("HTTP {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(format!("failed to read response: {}", e)))?;

        parse_range_response(service, &body)
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}

/// Decode a query_range body into one summed, ordered series
fn parse_range_response(service: &str, body: &str) -> Result<Vec<(DateTime<Utc>, f64)>> {
    let query_error = |reason: String| ScalerError::QueryError {
        service: service.to_string(),
        reason,
    };

    let response: QueryRangeResponse = serde_json::from_str(body)
        .map_err(|e| query_error(format!("malformed response: {}", e)))?;

    if response.status != "success" {
        return Err(query_error(
            response
                .error
                .unwrap_or_else(|| format!("status '{}'", response.status)),
        ));
    }

    let data = response
        .data
        .ok_or_else(|| query_error("response has no data".to_string()))?;

    if data.result_type != "matrix" {
        return Err(query_error(format!(
            "expected matrix result, got '{}'",
            data.result_type
        )));
    }

    let mut summed: BTreeMap<i64, f64> = BTreeMap::new();
    for series in data.result {
        for (ts, raw) in series.values {
            let value = match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => continue,
            };
            if !ts.is_finite() {
                continue;
            }
            let millis = (ts * 1000.0).round() as i64;
            *summed.entry(millis).or_insert(0.0) += value;
        }
    }

    Ok(summed
        .into_iter()
        .filter_map(|(millis, value)| {
            DateTime::<Utc>::from_timestamp_millis(millis).map(|ts| (ts, value))
        })
        .collect())
}
