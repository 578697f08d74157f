//! Load forecasting
//!
//! Keeps the rolling per-service history, turns it into a one-step-ahead
//! request-rate forecast and scores how much that forecast can be trusted.

mod confidence;
mod forecast;
mod history;

pub use confidence::{
    population_variance, ConfidenceScorer, COLD_START_CONFIDENCE, CONFIDENCE_CEILING,
    CONFIDENCE_FLOOR, CONFIDENCE_WINDOW, MIN_CONFIDENCE_SAMPLES,
};
pub use forecast::{
    linear_fit, LinearFit, TrendForecaster, COLD_START_SAMPLES, MIN_TREND_SAMPLES, TREND_WINDOW,
};
pub use history::{ServiceHistory, HISTORY_CAPACITY};

/// Turns a service's history into a single non-negative load estimate.
///
/// Implementations must not fail: numerical problems fall back to the
/// most recent observed rate.
pub trait Forecaster: Send + Sync {
    fn forecast(&self, history: &ServiceHistory) -> f64;
}
