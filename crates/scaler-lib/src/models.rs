//! Core data models for the scaling engine

use crate::error::{Result, ScalerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One load observation for a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    /// Requests per second, never negative
    pub request_rate: f64,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub response_time: Option<f64>,
}

impl MetricSample {
    /// Create a request-rate-only sample; negative rates are floored at zero
    pub fn new(service: impl Into<String>, timestamp: DateTime<Utc>, request_rate: f64) -> Self {
        Self {
            timestamp,
            service: service.into(),
            request_rate: request_rate.max(0.0),
            cpu_usage: None,
            memory_usage: None,
            response_time: None,
        }
    }
}

/// Proposed replica change produced by one policy evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingDecision {
    pub service: String,
    pub current_replicas: u32,
    pub target_replicas: u32,
    pub reason: String,
    /// Always within [0, 1]
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Static per-deployment scaling limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingLimits {
    #[serde(default = "default_min_replicas")]
    pub min_replicas: u32,

    #[serde(default = "default_max_replicas")]
    pub max_replicas: u32,

    /// Forecast value above which scale-up pressure begins
    #[serde(default = "default_scale_threshold")]
    pub scale_threshold: f64,

    /// Minimum time between two applied actions on the same service
    #[serde(default = "default_cooldown_period", with = "duration_str")]
    pub cooldown_period: Duration,

    /// Decisions at or below this confidence are suppressed
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_replicas() -> u32 {
    2
}

fn default_max_replicas() -> u32 {
    20
}

fn default_scale_threshold() -> f64 {
    0.8
}

fn default_cooldown_period() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_min_confidence() -> f64 {
    0.5
}

impl Default for ScalingLimits {
    fn default() -> Self {
        Self {
            min_replicas: default_min_replicas(),
            max_replicas: default_max_replicas(),
            scale_threshold: default_scale_threshold(),
            cooldown_period: default_cooldown_period(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl ScalingLimits {
    /// Reject limits the policy cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.min_replicas > self.max_replicas {
            return Err(ScalerError::InvalidLimits(format!(
                "min_replicas ({}) exceeds max_replicas ({})",
                self.min_replicas, self.max_replicas
            )));
        }
        if !self.scale_threshold.is_finite() || self.scale_threshold <= 0.0 {
            return Err(ScalerError::InvalidLimits(format!(
                "scale_threshold must be a positive number, got {}",
                self.scale_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ScalerError::InvalidLimits(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Serde adapter for human-readable durations such as `"5m"` or `"60s"`
pub mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s)
            .map_err(|e| D::Error::custom(format!("invalid duration '{}': {}", s, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_floored_at_zero() {
        let sample = MetricSample::new("api", Utc::now(), -3.0);
        assert_eq!(sample.request_rate, 0.0);
        assert!(sample.cpu_usage.is_none());
    }

    #[test]
    fn test_default_limits_match_deployment_defaults() {
        let limits = ScalingLimits::default();
        assert_eq!(limits.min_replicas, 2);
        assert_eq!(limits.max_replicas, 20);
        assert_eq!(limits.scale_threshold, 0.8);
        assert_eq!(limits.cooldown_period, Duration::from_secs(300));
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let limits = ScalingLimits {
            min_replicas: 10,
            max_replicas: 5,
            ..ScalingLimits::default()
        };
        assert!(matches!(
            limits.validate(),
            Err(ScalerError::InvalidLimits(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let limits = ScalingLimits {
                scale_threshold: threshold,
                ..ScalingLimits::default()
            };
            assert!(limits.validate().is_err(), "threshold {} accepted", threshold);
        }
    }

    #[test]
    fn test_limits_deserialize_human_durations() {
        let json = r#"{"min_replicas": 1, "max_replicas": 8, "cooldown_period": "90s"}"#;
        let limits: ScalingLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits.min_replicas, 1);
        assert_eq!(limits.max_replicas, 8);
        assert_eq!(limits.cooldown_period, Duration::from_secs(90));
        assert_eq!(limits.scale_threshold, 0.8);
    }

    #[test]
    fn test_limits_reject_malformed_duration() {
        let json = r#"{"cooldown_period": "soon"}"#;
        assert!(serde_json::from_str::<ScalingLimits>(json).is_err());
    }
}
