//! One-step-ahead load forecasting
//!
//! Fits an ordinary-least-squares line of request rate against sample
//! index over the recent window and extrapolates one step past the last
//! sample. Short histories fall back to the last observed rate.

use super::{Forecaster, ServiceHistory};
use tracing::debug;

/// Below this many recorded samples the last observed rate is used as-is
pub const COLD_START_SAMPLES: usize = 10;

/// Number of recent samples the trend is fitted over
pub const TREND_WINDOW: usize = 30;

/// Minimum samples inside the trend window for a regression
pub const MIN_TREND_SAMPLES: usize = 5;

/// Straight line fitted by least squares
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit `values[i]` against `i`; `None` when the fit is degenerate
pub fn linear_fit(values: &[f64]) -> Option<LinearFit> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();
    let denom = n * sum_x2 - sum_x.powi(2);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }
    Some(LinearFit { slope, intercept })
}

/// Linear trend extrapolation over the most recent samples
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    cold_start_samples: usize,
    trend_window: usize,
    min_trend_samples: usize,
}

impl TrendForecaster {
    pub fn new() -> Self {
        Self {
            cold_start_samples: COLD_START_SAMPLES,
            trend_window: TREND_WINDOW,
            min_trend_samples: MIN_TREND_SAMPLES,
        }
    }

    pub fn with_window(trend_window: usize) -> Self {
        Self {
            trend_window,
            ..Self::new()
        }
    }
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for TrendForecaster {
    fn forecast(&self, history: &ServiceHistory) -> f64 {
        let last = non_negative(history.latest().map(|s| s.request_rate).unwrap_or(0.0));

        if history.len() < self.cold_start_samples {
            return last;
        }

        let rates = history.recent_rates(self.trend_window);
        if rates.len() < self.min_trend_samples {
            return last;
        }

        match linear_fit(&rates) {
            Some(fit) => {
                let predicted = fit.predict(rates.len() as f64);
                if predicted.is_finite() {
                    predicted.max(0.0)
                } else {
                    debug!(slope = fit.slope, "Non-finite extrapolation, using last sample");
                    last
                }
            }
            None => {
                debug!(samples = rates.len(), "Degenerate trend fit, using last sample");
                last
            }
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
