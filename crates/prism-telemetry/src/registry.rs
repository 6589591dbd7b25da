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

//! The metrics registry and its typed handles.

use crate::backend::{InMemoryBackend, MetricsBackend};
use crate::metric::{HistogramSummary, MetricId, MetricKind, MetricValue, MetricsError, MetricsResult};
use serde::Serialize;
use std::sync::Arc;

/// One metric as captured by [`MetricsRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// The metric.
    pub id: MetricId,
    /// Its value at capture time.
    pub value: MetricValue,
}

/// Registers metrics and hands out handles to update them.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// A registry over a fresh [`InMemoryBackend`].
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()))
    }

    /// A registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Registers a counter starting at zero.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.backend.register(id.clone(), MetricValue::Counter(0))?;
        Ok(CounterHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers a gauge starting at zero.
    pub fn register_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        self.backend.register(id.clone(), MetricValue::Gauge(0.0))?;
        Ok(GaugeHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers a histogram with the given bucket bounds.
    pub fn register_histogram(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        bounds: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        let id = MetricId::new(namespace, name);
        let summary = HistogramSummary::new(bounds)?;
        self.backend
            .register(id.clone(), MetricValue::Histogram(summary))?;
        Ok(HistogramHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// The value of `id`.
    pub fn get(&self, id: &MetricId) -> MetricsResult<MetricValue> {
        self.backend.get(id)
    }

    /// The counter `namespace:name`, or `None` if it is not a registered counter.
    pub fn counter_value(&self, namespace: &str, name: &str) -> Option<u64> {
        self.backend
            .get(&MetricId::new(namespace, name))
            .ok()
            .and_then(|value| value.as_counter())
    }

    /// Every metric sorted by id.
    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        let mut metrics: Vec<_> = self
            .backend
            .list()
            .into_iter()
            .map(|(id, value)| MetricSnapshot { id, value })
            .collect();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));
        metrics
    }

    /// The snapshot as pretty-printed JSON.
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|e| {
            log::warn!("Failed to serialize metrics snapshot: {e}");
            String::from("[]")
        })
    }

    /// Resets every metric of `namespace` to its initial value.
    pub fn reset_namespace(&self, namespace: &str) {
        for (id, _) in self.backend.list() {
            if id.namespace != namespace {
                continue;
            }
            let result = self.backend.update(&id, &mut |value| {
                value.reset();
                Ok(())
            });
            if let Err(e) = result {
                log::warn!("Failed to reset {id}: {e}");
            }
        }
    }

    /// The number of registered metrics.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// The backend.
    pub fn backend(&self) -> &Arc<dyn MetricsBackend> {
        &self.backend
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Updates a registered counter.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    /// Adds one.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, 1)
    }

    /// Adds `amount`.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, amount)
    }

    /// The current value.
    pub fn get(&self) -> MetricsResult<u64> {
        let value = self.backend.get(&self.id)?;
        value.as_counter().ok_or(MetricsError::KindMismatch {
            id: self.id.clone(),
            expected: MetricKind::Counter,
            found: value.kind(),
        })
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Updates a registered gauge.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    /// Writes the gauge.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value)
    }

    /// The current value.
    pub fn get(&self) -> MetricsResult<f64> {
        let value = self.backend.get(&self.id)?;
        value.as_gauge().ok_or(MetricsError::KindMismatch {
            id: self.id.clone(),
            expected: MetricKind::Gauge,
            found: value.kind(),
        })
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Updates a registered histogram.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl HistogramHandle {
    /// Records one observation.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        self.backend.observe(&self.id, sample)
    }

    /// The current distribution.
    pub fn summary(&self) -> MetricsResult<HistogramSummary> {
        match self.backend.get(&self.id)? {
            MetricValue::Histogram(summary) => Ok(summary),
            other => Err(MetricsError::KindMismatch {
                id: self.id.clone(),
                expected: MetricKind::Histogram,
                found: other.kind(),
            }),
        }
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn handles_share_the_backend() {
        let registry = MetricsRegistry::new();
        let draws = registry.register_counter("rhi", "rhi_draw").unwrap();
        let again = registry.register_counter("rhi", "rhi_draw").unwrap();

        draws.increment().unwrap();
        again.increment_by(2).unwrap();

        assert_eq!(draws.get().unwrap(), 3);
        assert_eq!(registry.counter_value("rhi", "rhi_draw"), Some(3));
        assert_eq!(registry.counter_value("rhi", "missing"), None);
    }

    #[test]
    fn snapshot_is_sorted_and_reset_is_scoped() {
        let registry = MetricsRegistry::new();
        let memory = registry.register_gauge("gpu", "memory_used_mb").unwrap();
        let dispatches = registry.register_counter("rhi", "rhi_dispatch").unwrap();
        let timings = registry
            .register_histogram("rhi", "pass_time_ms", vec![1.0, 4.0, 16.0])
            .unwrap();

        memory.set(512.0).unwrap();
        dispatches.increment().unwrap();
        timings.observe(2.5).unwrap();

        let names: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["gpu:memory_used_mb", "rhi:pass_time_ms", "rhi:rhi_dispatch"]
        );

        registry.reset_namespace("rhi");
        assert_eq!(dispatches.get().unwrap(), 0);
        assert_eq!(timings.summary().unwrap().count, 0);
        assert_relative_eq!(memory.get().unwrap(), 512.0);
        assert!(registry.snapshot_json().contains("memory_used_mb"));
    }
}
