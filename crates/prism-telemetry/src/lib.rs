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

//! Metric storage for the RHI.
//!
//! A [`MetricsRegistry`] hands out typed handles to counters, gauges and
//! histograms held by a [`MetricsBackend`]. The profiler in `prism-infra`
//! publishes the command list's binding counters and pass timings here.

#![warn(missing_docs)]

pub mod backend;
pub mod metric;
pub mod registry;
pub mod timer;

pub use backend::{InMemoryBackend, MetricsBackend};
pub use metric::{HistogramSummary, MetricId, MetricKind, MetricValue, MetricsError, MetricsResult};
pub use registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricSnapshot, MetricsRegistry};
pub use timer::ScopedMetricTimer;
