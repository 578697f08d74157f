//! Confidence scoring for forecasts
//!
//! Stable recent traffic scores close to the ceiling, volatile traffic is
//! penalised. The score never reaches zero or full certainty.

use super::ServiceHistory;

/// Number of most recent samples the score is computed over
pub const CONFIDENCE_WINDOW: usize = 10;

/// Below this many samples the fixed cold-start score applies
pub const MIN_CONFIDENCE_SAMPLES: usize = 5;

/// Score used when there is too little data
pub const COLD_START_CONFIDENCE: f64 = 0.3;

pub const CONFIDENCE_FLOOR: f64 = 0.1;
pub const CONFIDENCE_CEILING: f64 = 0.9;

/// Scores how far a forecast can be trusted from recent rate variance
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score the most recent samples of a service's history
    pub fn score(&self, history: &ServiceHistory) -> f64 {
        self.score_rates(&history.recent_rates(CONFIDENCE_WINDOW))
    }

    /// Score a series of request rates, oldest first; only the last
    /// `CONFIDENCE_WINDOW` values are considered
    pub fn score_rates(&self, rates: &[f64]) -> f64 {
        if rates.len() < MIN_CONFIDENCE_SAMPLES {
            return COLD_START_CONFIDENCE;
        }
        let recent = &rates[rates.len().saturating_sub(CONFIDENCE_WINDOW)..];
        let variance = population_variance(recent);
        let raw = 1.0 / (1.0 + variance);
        if raw.is_finite() {
            raw.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
        } else {
            CONFIDENCE_FLOOR
        }
    }
}

/// Population variance (divides by `n`)
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
