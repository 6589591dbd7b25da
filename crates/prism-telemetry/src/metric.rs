// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Metric identifiers, values and errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a metric by namespace and name, e.g. `rhi:rhi_draw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricId {
    /// The subsystem the metric belongs to.
    pub namespace: String,
    /// The metric name within the namespace.
    pub name: String,
}

impl MetricId {
    /// Creates an id.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// The kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Monotonic count, reset explicitly.
    Counter,
    /// Last written value.
    Gauge,
    /// Distribution of observed values.
    Histogram,
}

/// Bucketed distribution of observations.
///
/// Only aggregates are kept, so a histogram fed every frame stays bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Inclusive upper bounds of the buckets, ascending.
    pub bounds: Vec<f64>,
    /// Observations per bucket. The last entry counts values above every bound.
    pub counts: Vec<u64>,
    /// Number of observations.
    pub count: u64,
    /// Sum of observations.
    pub sum: f64,
    /// Smallest observation, `0.0` when empty.
    pub min: f64,
    /// Largest observation, `0.0` when empty.
    pub max: f64,
}

impl HistogramSummary {
    /// An empty histogram with the given bucket bounds.
    pub fn new(bounds: Vec<f64>) -> MetricsResult<Self> {
        if bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MetricsError::InvalidBuckets(bounds));
        }
        let counts = vec![0; bounds.len() + 1];
        Ok(Self {
            bounds,
            counts,
            count: 0,
            sum: 0.0,
            min: 0.0,
            max: 0.0,
        })
    }

    /// Records one observation.
    pub fn observe(&mut self, value: f64) {
        let bucket = self
            .bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bounds.len());
        self.counts[bucket] += 1;
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// Mean of the observations, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn clear(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
        self.count = 0;
        self.sum = 0.0;
        self.min = 0.0;
        self.max = 0.0;
    }
}

/// The current value of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue {
    /// A counter.
    Counter(u64),
    /// A gauge.
    Gauge(f64),
    /// A histogram.
    Histogram(HistogramSummary),
}

impl MetricValue {
    /// The kind of this value.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Histogram(_) => MetricKind::Histogram,
        }
    }

    /// The counter value, if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(value) => Some(*value),
            _ => None,
        }
    }

    /// The gauge value, if this is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(value) => Some(*value),
            _ => None,
        }
    }

    /// The histogram, if this is a histogram.
    pub fn as_histogram(&self) -> Option<&HistogramSummary> {
        match self {
            MetricValue::Histogram(summary) => Some(summary),
            _ => None,
        }
    }

    /// Returns the value to its initial state, keeping histogram buckets.
    pub fn reset(&mut self) {
        match self {
            MetricValue::Counter(value) => *value = 0,
            MetricValue::Gauge(value) => *value = 0.0,
            MetricValue::Histogram(summary) => summary.clear(),
        }
    }
}

/// Result alias for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised by metric operations.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// No metric with this id is registered.
    NotFound(MetricId),
    /// The metric exists with a different kind.
    KindMismatch {
        /// The metric.
        id: MetricId,
        /// The kind the operation needs.
        expected: MetricKind,
        /// The kind that is registered.
        found: MetricKind,
    },
    /// Histogram bounds are not strictly ascending.
    InvalidBuckets(Vec<f64>),
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::NotFound(id) => write!(f, "Metric not found: {id}"),
            MetricsError::KindMismatch {
                id,
                expected,
                found,
            } => write!(f, "Metric {id} is a {found:?}, expected a {expected:?}"),
            MetricsError::InvalidBuckets(bounds) => {
                write!(f, "Histogram bounds must be strictly ascending: {bounds:?}")
            }
        }
    }
}

impl std::error::Error for MetricsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn histogram_buckets_observations() {
        let mut histogram = HistogramSummary::new(vec![1.0, 5.0]).unwrap();
        histogram.observe(0.5);
        histogram.observe(5.0);
        histogram.observe(9.0);

        assert_eq!(histogram.counts, vec![1, 1, 1]);
        assert_eq!(histogram.count, 3);
        assert_relative_eq!(histogram.min, 0.5);
        assert_relative_eq!(histogram.max, 9.0);
        assert_relative_eq!(histogram.mean(), 14.5 / 3.0);
    }

    #[test]
    fn histogram_rejects_unsorted_bounds() {
        assert!(matches!(
            HistogramSummary::new(vec![2.0, 1.0]),
            Err(MetricsError::InvalidBuckets(_))
        ));
    }

    #[test]
    fn reset_keeps_the_kind() {
        let mut value = MetricValue::Counter(7);
        value.reset();
        assert_eq!(value, MetricValue::Counter(0));
        assert_eq!(MetricId::new("rhi", "rhi_draw").to_string(), "rhi:rhi_draw");
    }
}
