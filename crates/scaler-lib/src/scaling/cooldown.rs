//! Scale suppression
//!
//! A decision is applied only when its confidence clears the configured
//! minimum and enough time has passed since the last applied action on the
//! same service. Last-applied times are shared with the executor, which
//! records them after a successful write.

use crate::models::ScalingDecision;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Service -> time of the last successfully applied decision
#[derive(Debug, Default)]
pub struct LastActions {
    applied: DashMap<String, DateTime<Utc>>,
}

impl LastActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service: &str) -> Option<DateTime<Utc>> {
        self.applied.get(service).map(|t| *t.value())
    }

    pub fn record(&self, service: &str, at: DateTime<Utc>) {
        self.applied.insert(service.to_string(), at);
    }
}

/// Outcome of gating a decision
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    Approved,
    LowConfidence { confidence: f64, required: f64 },
    CoolingDown { remaining: Duration },
}

impl GateVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateVerdict::Approved)
    }

    /// Label used in metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            GateVerdict::Approved => "approved",
            GateVerdict::LowConfidence { .. } => "suppressed_confidence",
            GateVerdict::CoolingDown { .. } => "suppressed_cooldown",
        }
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateVerdict::Approved => f.write_str("approved"),
            GateVerdict::LowConfidence { confidence, required } => write!(
                f,
                "confidence {:.2} does not exceed required {:.2}",
                confidence, required
            ),
            GateVerdict::CoolingDown { remaining } => write!(
                f,
                "cooldown active for another {}",
                humantime::format_duration(*remaining)
            ),
        }
    }
}

/// Suppresses low-confidence decisions and actions inside the cooldown window
#[derive(Debug, Clone)]
pub struct CooldownGate {
    min_confidence: f64,
    cooldown: Duration,
    last_actions: Arc<LastActions>,
}

impl CooldownGate {
    pub fn new(min_confidence: f64, cooldown: Duration, last_actions: Arc<LastActions>) -> Self {
        Self {
            min_confidence,
            cooldown,
            last_actions,
        }
    }

    pub fn check(&self, decision: &ScalingDecision) -> GateVerdict {
        if decision.confidence <= self.min_confidence {
            return GateVerdict::LowConfidence {
                confidence: decision.confidence,
                required: self.min_confidence,
            };
        }

        if let Some(last) = self.last_actions.get(&decision.service) {
            // A decision stamped before the last action counts as zero elapsed
            let elapsed = (decision.timestamp - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.cooldown {
                return GateVerdict::CoolingDown {
                    remaining: self.cooldown - elapsed,
                };
            }
        }

        GateVerdict::Approved
    }

    pub fn should_apply(&self, decision: &ScalingDecision) -> bool {
        self.check(decision).is_approved()
    }

    pub fn last_applied(&self, service: &str) -> Option<DateTime<Utc>> {
        self.last_actions.get(service)
    }
}
