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

//! Scope timers that feed histograms.

use crate::registry::HistogramHandle;
use std::time::Instant;

/// Records the time between its creation and its drop, in milliseconds,
/// into a histogram.
#[derive(Debug)]
pub struct ScopedMetricTimer {
    start: Instant,
    histogram: HistogramHandle,
}

impl ScopedMetricTimer {
    /// Starts timing.
    pub fn new(histogram: HistogramHandle) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    /// Time elapsed so far, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ScopedMetricTimer {
    fn drop(&mut self) {
        if let Err(e) = self.histogram.observe(self.elapsed_ms()) {
            log::warn!("Failed to record {}: {e}", self.histogram.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricsRegistry;

    #[test]
    fn records_on_drop() {
        let registry = MetricsRegistry::new();
        let histogram = registry
            .register_histogram("test", "scope_ms", vec![1000.0])
            .unwrap();
        {
            let _timer = ScopedMetricTimer::new(histogram.clone());
        }
        let summary = histogram.summary().unwrap();
        assert_eq!(summary.count, 1);
        assert!(summary.min >= 0.0);
    }
}
