//! Forecast to replica-target mapping
//!
//! The policy is asymmetric: load above the threshold scales up
//! multiplicatively (always by at least one replica), anything else keeps
//! the current count. The result is then clamped to the static limits.

use crate::error::Result;
use crate::models::{ScalingDecision, ScalingLimits};
use chrono::{DateTime, Utc};

/// Pure mapping from (forecast, current replicas) to a target
#[derive(Debug, Clone)]
pub struct ScalingPolicy {
    limits: ScalingLimits,
}

impl ScalingPolicy {
    /// Build a policy; rejects limits that fail validation
    pub fn new(limits: ScalingLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self { limits })
    }

    /// Target replica count for a forecast, within `[min_replicas, max_replicas]`
    pub fn target_replicas(&self, forecast: f64, current: u32) -> u32 {
        let threshold = self.limits.scale_threshold;

        let target = if forecast > threshold {
            let scale_factor = forecast / threshold;
            // Float-to-int `as` saturates, so huge factors land on u32::MAX
            let scaled = (current as f64 * scale_factor).floor() as u32;
            current.saturating_add(1).max(scaled)
        } else {
            current
        };

        target
            .max(self.limits.min_replicas)
            .min(self.limits.max_replicas)
    }

    /// Produce a decision, or `None` when the target equals the current count
    pub fn decide(
        &self,
        service: &str,
        forecast: f64,
        current: u32,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Option<ScalingDecision> {
        let target = self.target_replicas(forecast, current);
        if target == current {
            return None;
        }

        Some(ScalingDecision {
            service: service.to_string(),
            current_replicas: current,
            target_replicas: target,
            reason: format!("Predicted load: {:.2}", forecast),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: now,
        })
    }
}
