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

//! An [`RhiProfiler`] that publishes into a [`MetricsRegistry`].
//!
//! Counters land in the `rhi` namespace under their [`RhiCounter::name`].
//! CPU time blocks are measured with a [`ScopedMetricTimer`] and recorded
//! when they end;
//! GPU time blocks bracket the pass with timestamp queries and are recorded
//! once [`MetricsProfiler::resolve_gpu_time_blocks`] reads the results back.

use prism_core::rhi::command_list::gpu_memory_used_mb;
use prism_core::rhi::error::QueryError;
use prism_core::rhi::query::{self, QueryWait, TimestampQueries};
use prism_core::rhi::traits::{
    RhiCounter, RhiDevice, RhiDeviceContext, RhiProfiler, TimeBlockId, TimeBlockKind,
};
use prism_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsError, MetricsRegistry, ScopedMetricTimer,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Namespace of the binding and draw counters.
pub const COUNTER_NAMESPACE: &str = "rhi";
/// Namespace of the per-pass CPU histograms, one per pass name.
pub const CPU_PASS_NAMESPACE: &str = "rhi.cpu_pass_ms";
/// Namespace of the per-pass GPU histograms, one per pass name.
pub const GPU_PASS_NAMESPACE: &str = "rhi.gpu_pass_ms";

const PASS_TIME_BUCKETS_MS: [f64; 9] = [0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 33.0];

enum OpenBlock {
    Cpu(ScopedMetricTimer),
    Gpu { name: String, queries: TimestampQueries },
}

struct PendingGpuBlock {
    name: String,
    queries: TimestampQueries,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publishes command-list counters and pass timings as metrics.
pub struct MetricsProfiler {
    device: Arc<dyn RhiDevice>,
    registry: MetricsRegistry,
    counters: Vec<(RhiCounter, CounterHandle)>,
    memory_used_mb: GaugeHandle,
    next_block: AtomicU64,
    open: Mutex<HashMap<TimeBlockId, OpenBlock>>,
    pending_gpu: Mutex<Vec<PendingGpuBlock>>,
    unbalanced_ends: AtomicU64,
    gpu_block_failures: AtomicU64,
}

impl MetricsProfiler {
    /// Registers every counter in `registry`. GPU time blocks create their
    /// queries on `device`.
    pub fn new(device: Arc<dyn RhiDevice>, registry: MetricsRegistry) -> Result<Self, MetricsError> {
        let mut counters = Vec::with_capacity(RhiCounter::ALL.len());
        for counter in RhiCounter::ALL {
            counters.push((
                counter,
                registry.register_counter(COUNTER_NAMESPACE, counter.name())?,
            ));
        }
        let memory_used_mb = registry.register_gauge("gpu", "memory_used_mb")?;
        Ok(Self {
            device,
            registry,
            counters,
            memory_used_mb,
            next_block: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
            pending_gpu: Mutex::new(Vec::new()),
            unbalanced_ends: AtomicU64::new(0),
            gpu_block_failures: AtomicU64::new(0),
        })
    }

    /// The registry metrics are published into.
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// The current value of `counter`.
    pub fn counter(&self, counter: RhiCounter) -> u64 {
        self.handle(counter)
            .and_then(|handle| handle.get().ok())
            .unwrap_or(0)
    }

    /// Resets every counter, typically once per frame.
    pub fn reset_counters(&self) {
        self.registry.reset_namespace(COUNTER_NAMESPACE);
    }

    /// Time blocks started but not yet ended.
    pub fn open_block_count(&self) -> usize {
        lock(&self.open).len()
    }

    /// GPU time blocks ended but not yet resolved.
    pub fn pending_gpu_block_count(&self) -> usize {
        lock(&self.pending_gpu).len()
    }

    /// Number of `time_block_end` calls for blocks that were not open.
    pub fn unbalanced_ends(&self) -> u64 {
        self.unbalanced_ends.load(Ordering::Relaxed)
    }

    /// Number of GPU time blocks that could not be opened because their
    /// queries failed to create.
    pub fn gpu_block_failures(&self) -> u64 {
        self.gpu_block_failures.load(Ordering::Relaxed)
    }

    /// Samples the adapter's memory usage into the `gpu:memory_used_mb` gauge.
    pub fn record_gpu_memory(&self) -> u64 {
        let used = gpu_memory_used_mb(self.device.as_ref());
        if let Err(e) = self.memory_used_mb.set(used as f64) {
            log::warn!("Failed to record GPU memory: {e}");
        }
        used
    }

    /// Reads back every ended GPU time block and records its duration.
    ///
    /// Blocks until each result is available or `wait` gives up. On failure
    /// the blocks not yet resolved stay pending. Returns how many were recorded.
    pub fn resolve_gpu_time_blocks(
        &self,
        ctx: &mut dyn RhiDeviceContext,
        wait: &QueryWait,
    ) -> Result<usize, QueryError> {
        let pending = std::mem::take(&mut *lock(&self.pending_gpu));
        let mut resolved = 0;
        let mut blocks = pending.into_iter();
        while let Some(block) = blocks.next() {
            match query::resolve_timestamp_duration(ctx, &block.queries, wait) {
                Ok(duration_ms) => {
                    self.observe(GPU_PASS_NAMESPACE, &block.name, duration_ms);
                    resolved += 1;
                }
                Err(e) => {
                    log::error!("Failed to resolve GPU time of pass '{}': {e}", block.name);
                    let mut pending = lock(&self.pending_gpu);
                    pending.push(block);
                    pending.extend(blocks);
                    return Err(e);
                }
            }
        }
        Ok(resolved)
    }

    fn handle(&self, counter: RhiCounter) -> Option<&CounterHandle> {
        self.counters
            .iter()
            .find(|(c, _)| *c == counter)
            .map(|(_, handle)| handle)
    }

    fn pass_histogram(&self, namespace: &str, pass: &str) -> Result<HistogramHandle, MetricsError> {
        self.registry
            .register_histogram(namespace, pass, PASS_TIME_BUCKETS_MS.to_vec())
    }

    fn observe(&self, namespace: &str, pass: &str, value_ms: f64) {
        let result = self
            .pass_histogram(namespace, pass)
            .and_then(|histogram| histogram.observe(value_ms));
        if let Err(e) = result {
            log::warn!("Failed to record time of pass '{pass}': {e}");
        }
    }
}

impl RhiProfiler for MetricsProfiler {
    fn increment(&self, counter: RhiCounter) {
        if let Some(handle) = self.handle(counter) {
            if let Err(e) = handle.increment() {
                log::warn!("Failed to increment {counter}: {e}");
            }
        }
    }

    fn time_block_start(
        &self,
        name: &str,
        kind: TimeBlockKind,
        ctx: &mut dyn RhiDeviceContext,
    ) -> Option<TimeBlockId> {
        let block = match kind {
            TimeBlockKind::Cpu => match self.pass_histogram(CPU_PASS_NAMESPACE, name) {
                Ok(histogram) => OpenBlock::Cpu(ScopedMetricTimer::new(histogram)),
                Err(e) => {
                    log::warn!("No CPU time block for pass '{name}': {e}");
                    return None;
                }
            },
            TimeBlockKind::Gpu => {
                let queries = match TimestampQueries::create(&self.device) {
                    Ok(queries) => queries,
                    Err(e) => {
                        log::error!("Failed to create GPU time block for pass '{name}': {e}");
                        self.gpu_block_failures.fetch_add(1, Ordering::Relaxed);
                        return None;
                    }
                };
                query::timestamp_start(ctx, &queries);
                OpenBlock::Gpu {
                    name: name.to_owned(),
                    queries,
                }
            }
        };
        let id = TimeBlockId(self.next_block.fetch_add(1, Ordering::Relaxed));
        lock(&self.open).insert(id, block);
        Some(id)
    }

    fn time_block_end(&self, block: TimeBlockId, ctx: &mut dyn RhiDeviceContext) {
        let Some(open) = lock(&self.open).remove(&block) else {
            log::warn!("Time block {} ended but it is not open", block.0);
            self.unbalanced_ends.fetch_add(1, Ordering::Relaxed);
            return;
        };
        match open {
            // Dropping the timer records the block.
            OpenBlock::Cpu(timer) => drop(timer),
            OpenBlock::Gpu { name, queries } => {
                query::timestamp_end(ctx, &queries);
                lock(&self.pending_gpu).push(PendingGpuBlock { name, queries });
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{HeadlessConfig, HeadlessDevice};
    use approx::assert_relative_eq;
    use prism_core::sync::CancellationToken;
    use std::time::Duration;

    fn profiler(config: HeadlessConfig) -> (HeadlessDevice, MetricsProfiler) {
        let device = HeadlessDevice::new(config);
        let profiler =
            MetricsProfiler::new(Arc::new(device.clone()), MetricsRegistry::new()).unwrap();
        (device, profiler)
    }

    #[test]
    fn gpu_blocks_resolve_into_histograms() {
        let (device, profiler) = profiler(HeadlessConfig {
            timestamp_frequency: 1_000_000,
            ticks_per_timestamp: 2_000,
            ..HeadlessConfig::default()
        });
        let mut ctx = device.create_headless_context();

        let block = profiler
            .time_block_start("lighting", TimeBlockKind::Gpu, &mut ctx)
            .unwrap();
        profiler.time_block_end(block, &mut ctx);
        assert_eq!(profiler.pending_gpu_block_count(), 1);

        let wait = QueryWait {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_micros(10),
            cancel: CancellationToken::new(),
        };
        assert_eq!(profiler.resolve_gpu_time_blocks(&mut ctx, &wait).unwrap(), 1);

        let summary = profiler
            .registry()
            .register_histogram(GPU_PASS_NAMESPACE, "lighting", PASS_TIME_BUCKETS_MS.to_vec())
            .unwrap()
            .summary()
            .unwrap();
        assert_eq!(summary.count, 1);
        // Start and end are one clock step apart: 2000 ticks at 1 MHz.
        assert_relative_eq!(summary.max, 2.0);
    }

    #[test]
    fn unbalanced_end_is_counted() {
        let (device, profiler) = profiler(HeadlessConfig::default());
        let mut ctx = device.create_headless_context();

        profiler.time_block_end(TimeBlockId(77), &mut ctx);

        assert_eq!(profiler.unbalanced_ends(), 1);
        assert_eq!(profiler.open_block_count(), 0);
    }

    #[test]
    fn failed_query_creation_is_reported() {
        let (device, profiler) = profiler(HeadlessConfig {
            fail_query_creation: true,
            ..HeadlessConfig::default()
        });
        let mut ctx = device.create_headless_context();

        assert!(profiler
            .time_block_start("shadows", TimeBlockKind::Gpu, &mut ctx)
            .is_none());
        assert_eq!(profiler.gpu_block_failures(), 1);
        assert!(profiler
            .time_block_start("shadows", TimeBlockKind::Cpu, &mut ctx)
            .is_some());
        assert_eq!(profiler.gpu_block_failures(), 1);
    }

    #[test]
    fn cpu_blocks_are_timed_into_their_pass_histogram() {
        let (device, profiler) = profiler(HeadlessConfig::default());
        let mut ctx = device.create_headless_context();

        let block = profiler
            .time_block_start("bloom", TimeBlockKind::Cpu, &mut ctx)
            .unwrap();
        std::thread::sleep(Duration::from_millis(2));
        profiler.time_block_end(block, &mut ctx);

        let summary = profiler
            .pass_histogram(CPU_PASS_NAMESPACE, "bloom")
            .unwrap()
            .summary()
            .unwrap();
        assert_eq!(summary.count, 1);
        assert!(summary.min >= 2.0, "{summary:?}");
        assert_eq!(profiler.open_block_count(), 0);
    }

    #[test]
    fn counters_are_published_by_name() {
        let (_device, profiler) = profiler(HeadlessConfig::default());
        profiler.increment(RhiCounter::Draw);
        profiler.increment(RhiCounter::Draw);

        assert_eq!(profiler.counter(RhiCounter::Draw), 2);
        assert_eq!(
            profiler.registry().counter_value(COUNTER_NAMESPACE, "rhi_draw"),
            Some(2)
        );

        profiler.reset_counters();
        assert_eq!(profiler.counter(RhiCounter::Draw), 0);
    }
}
