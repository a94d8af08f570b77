//! Metric Series Module
//!
//! Bounded FIFO window of samples for a single operation.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Sample ==
/// One recorded measurement, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub value_ms: f64,
    pub timestamp: DateTime<Utc>,
}

// == Metric Summary ==
/// Aggregates over the current window of one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSummary {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub latest: f64,
}

// == Metric Series ==
/// Rolling window holding at most `capacity` samples; the oldest is dropped first.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl MetricSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, trimming from the front to stay within capacity.
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Mean of the window, or 0.0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self.samples.iter().map(|s| s.value_ms).sum();
        total / self.samples.len() as f64
    }

    /// Summary of the window; all zeros when empty.
    pub fn summary(&self) -> MetricSummary {
        let Some(latest) = self.samples.back() else {
            return MetricSummary::default();
        };

        let (min, max) = self
            .samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), s| {
                (min.min(s.value_ms), max.max(s.value_ms))
            });

        MetricSummary {
            count: self.samples.len(),
            average: self.average(),
            min,
            max,
            latest: latest.value_ms,
        }
    }
}
