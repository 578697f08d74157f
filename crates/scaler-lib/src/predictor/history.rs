//! Per-service rolling history of load samples
//!
//! A fixed-capacity ring of the most recent observations, oldest first.
//! Overlapping query windows are deduplicated on the way in so that the
//! ring stays ordered by timestamp.

use crate::models::MetricSample;
use chrono::{DateTime, Utc};
use std::collections::vec_deque::{self, VecDeque};

/// Maximum number of samples retained per service
pub const HISTORY_CAPACITY: usize = 1000;

/// Rolling window of samples for a single service
#[derive(Debug, Clone)]
pub struct ServiceHistory {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl ServiceHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append samples in order, evicting the oldest entries past capacity.
    ///
    /// Samples that are not strictly newer than the newest recorded one are
    /// dropped. Returns the number of samples accepted.
    pub fn record<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = MetricSample>,
    {
        let mut accepted = 0;
        for sample in samples {
            if let Some(newest) = self.newest_timestamp() {
                if sample.timestamp <= newest {
                    continue;
                }
            }
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
            accepted += 1;
        }
        accepted
    }

    /// The most recent `n` samples (or fewer), oldest first
    pub fn window(&self, n: usize) -> vec_deque::Iter<'_, MetricSample> {
        let start = self.samples.len().saturating_sub(n);
        self.samples.range(start..)
    }

    /// Request rates of the most recent `n` samples, oldest first
    pub fn recent_rates(&self, n: usize) -> Vec<f64> {
        self.window(n).map(|s| s.request_rate).collect()
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    pub fn newest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.back().map(|s| s.timestamp)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for ServiceHistory {
    fn default() -> Self {
        Self::new()
    }
}
