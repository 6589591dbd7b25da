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

//! Storage backends for metrics.

use crate::metric::{MetricId, MetricKind, MetricValue, MetricsError, MetricsResult};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};

/// Where metric values live.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Registers `id` with an initial value.
    ///
    /// Registering an existing id of the same kind keeps the stored value;
    /// a different kind fails with [`MetricsError::KindMismatch`].
    fn register(&self, id: MetricId, initial: MetricValue) -> MetricsResult<()>;

    /// A copy of the value of `id`.
    fn get(&self, id: &MetricId) -> MetricsResult<MetricValue>;

    /// Mutates the value of `id` in place.
    fn update(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut MetricValue) -> MetricsResult<()>,
    ) -> MetricsResult<()>;

    /// Removes `id`.
    fn remove(&self, id: &MetricId) -> MetricsResult<()>;

    /// Every metric, in no particular order.
    fn list(&self) -> Vec<(MetricId, MetricValue)>;

    /// Removes every metric.
    fn clear(&self);

    /// The number of registered metrics.
    fn len(&self) -> usize;

    /// `true` when nothing is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Adds `delta` to a counter and returns the new value.
    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64> {
        let mut result = 0;
        self.update(id, &mut |value| match value {
            MetricValue::Counter(count) => {
                *count = count.saturating_add(delta);
                result = *count;
                Ok(())
            }
            other => Err(mismatch(id, MetricKind::Counter, other)),
        })?;
        Ok(result)
    }

    /// Writes a gauge.
    fn set_gauge(&self, id: &MetricId, gauge: f64) -> MetricsResult<()> {
        self.update(id, &mut |value| match value {
            MetricValue::Gauge(current) => {
                *current = gauge;
                Ok(())
            }
            other => Err(mismatch(id, MetricKind::Gauge, other)),
        })
    }

    /// Records a histogram observation.
    fn observe(&self, id: &MetricId, sample: f64) -> MetricsResult<()> {
        self.update(id, &mut |value| match value {
            MetricValue::Histogram(summary) => {
                summary.observe(sample);
                Ok(())
            }
            other => Err(mismatch(id, MetricKind::Histogram, other)),
        })
    }
}

fn mismatch(id: &MetricId, expected: MetricKind, found: &MetricValue) -> MetricsError {
    MetricsError::KindMismatch {
        id: id.clone(),
        expected,
        found: found.kind(),
    }
}

/// A backend keeping every metric in a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, MetricValue>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every metric of `namespace`.
    pub fn namespace(&self, namespace: &str) -> Vec<(MetricId, MetricValue)> {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        storage
            .iter()
            .filter(|(id, _)| id.namespace == namespace)
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }
}

impl MetricsBackend for InMemoryBackend {
    fn register(&self, id: MetricId, initial: MetricValue) -> MetricsResult<()> {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        match storage.get(&id) {
            Some(existing) if existing.kind() != initial.kind() => {
                Err(mismatch(&id, initial.kind(), existing))
            }
            Some(_) => Ok(()),
            None => {
                log::trace!("Registered metric {id}");
                storage.insert(id, initial);
                Ok(())
            }
        }
    }

    fn get(&self, id: &MetricId) -> MetricsResult<MetricValue> {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        storage
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::NotFound(id.clone()))
    }

    fn update(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut MetricValue) -> MetricsResult<()>,
    ) -> MetricsResult<()> {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        let value = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::NotFound(id.clone()))?;
        update(value)
    }

    fn remove(&self, id: &MetricId) -> MetricsResult<()> {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        storage
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetricsError::NotFound(id.clone()))
    }

    fn list(&self) -> Vec<(MetricId, MetricValue)> {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        storage
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    fn clear(&self) {
        self.storage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn len(&self) -> usize {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("rhi", "rhi_draw");
        backend.register(id.clone(), MetricValue::Counter(0)).unwrap();

        assert_eq!(backend.increment_counter(&id, 2).unwrap(), 2);
        assert_eq!(backend.increment_counter(&id, 3).unwrap(), 5);
        assert_eq!(backend.get(&id).unwrap(), MetricValue::Counter(5));
    }

    #[test]
    fn re_registering_keeps_the_value() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("rhi", "rhi_dispatch");
        backend.register(id.clone(), MetricValue::Counter(0)).unwrap();
        backend.increment_counter(&id, 1).unwrap();
        backend.register(id.clone(), MetricValue::Counter(0)).unwrap();
        assert_eq!(backend.get(&id).unwrap().as_counter(), Some(1));

        assert!(matches!(
            backend.register(id, MetricValue::Gauge(0.0)),
            Err(MetricsError::KindMismatch { .. })
        ));
    }

    #[test]
    fn wrong_kind_and_missing_metrics_fail() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("gpu", "memory_mb");
        assert!(matches!(
            backend.set_gauge(&id, 1.0),
            Err(MetricsError::NotFound(_))
        ));

        backend.register(id.clone(), MetricValue::Gauge(0.0)).unwrap();
        assert!(matches!(
            backend.increment_counter(&id, 1),
            Err(MetricsError::KindMismatch {
                expected: MetricKind::Counter,
                found: MetricKind::Gauge,
                ..
            })
        ));
        assert_eq!(backend.namespace("gpu").len(), 1);
        assert!(backend.namespace("rhi").is_empty());
    }
}
