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

//! GPU queries and the timestamp protocol.
//!
//! A measured interval uses three queries: a disjoint query that brackets the
//! interval and reports the tick frequency, and two timestamp queries that
//! capture the GPU clock at the start and at the end.

use crate::rhi::common::BackendHandle;
use crate::rhi::error::QueryError;
use crate::rhi::settings::RhiSettings;
use crate::rhi::traits::{RhiDevice, RhiDeviceContext};
use crate::sync::CancellationToken;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Longest sleep between two polls of a query result.
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// The kind of a GPU query object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Reports whether the GPU clock stayed stable, and its frequency.
    TimestampDisjoint,
    /// Captures the GPU clock.
    Timestamp,
}

/// A query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryData {
    /// Result of a disjoint query.
    Disjoint {
        /// `true` if the clock changed during the interval.
        disjoint: bool,
        /// Ticks per second.
        frequency: u64,
    },
    /// Result of a timestamp query, in ticks.
    Timestamp(u64),
}

/// A GPU query object, released on drop.
pub struct GpuQuery {
    handle: BackendHandle,
    kind: QueryKind,
    device: Weak<dyn RhiDevice>,
}

impl GpuQuery {
    /// Creates a query on `device`. Failure is logged and returned; there is no fallback.
    pub fn create(device: &Arc<dyn RhiDevice>, kind: QueryKind) -> Result<Self, QueryError> {
        match device.create_query(kind) {
            Ok(handle) => Ok(Self {
                handle,
                kind,
                device: Arc::downgrade(device),
            }),
            Err(err) => {
                log::error!("Failed to create {kind:?} query: {err}");
                Err(err)
            }
        }
    }

    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.handle
    }

    /// The query kind.
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Destroys the query now instead of at the end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for GpuQuery {
    fn drop(&mut self) {
        if let Some(device) = self.device.upgrade() {
            device.release_query(self.handle);
        }
    }
}

impl std::fmt::Debug for GpuQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuQuery")
            .field("handle", &self.handle.raw())
            .field("kind", &self.kind)
            .finish()
    }
}

/// The three queries measuring one interval.
#[derive(Debug)]
pub struct TimestampQueries {
    /// Brackets the interval.
    pub disjoint: GpuQuery,
    /// Captures the start tick.
    pub start: GpuQuery,
    /// Captures the end tick.
    pub end: GpuQuery,
}

impl TimestampQueries {
    /// Creates the three queries.
    pub fn create(device: &Arc<dyn RhiDevice>) -> Result<Self, QueryError> {
        Ok(Self {
            disjoint: GpuQuery::create(device, QueryKind::TimestampDisjoint)?,
            start: GpuQuery::create(device, QueryKind::Timestamp)?,
            end: GpuQuery::create(device, QueryKind::Timestamp)?,
        })
    }
}

/// Bounds a blocking query readback.
#[derive(Debug, Clone)]
pub struct QueryWait {
    /// Give up after this long.
    pub timeout: Duration,
    /// First poll interval. Doubles after every miss.
    pub poll_interval: Duration,
    /// Give up once cancelled.
    pub cancel: CancellationToken,
}

impl QueryWait {
    /// A wait bounded by the query settings.
    pub fn from_settings(settings: &RhiSettings) -> Self {
        Self {
            timeout: settings.query_timeout(),
            poll_interval: settings.query_poll_interval(),
            cancel: CancellationToken::new(),
        }
    }
}

/// Converts a tick interval to milliseconds. A disjoint interval is unreliable
/// and measures zero.
pub fn timestamp_duration_ms(disjoint: bool, frequency: u64, start: u64, end: u64) -> f64 {
    if disjoint || frequency == 0 {
        return 0.0;
    }
    end.saturating_sub(start) as f64 * 1000.0 / frequency as f64
}

/// Opens the interval: begins the disjoint query and captures the start tick.
pub fn timestamp_start(ctx: &mut dyn RhiDeviceContext, queries: &TimestampQueries) {
    ctx.begin_query(queries.disjoint.handle());
    ctx.end_query(queries.start.handle());
}

/// Closes the interval: captures the end tick and ends the disjoint query.
pub fn timestamp_end(ctx: &mut dyn RhiDeviceContext, queries: &TimestampQueries) {
    ctx.end_query(queries.end.handle());
    ctx.end_query(queries.disjoint.handle());
}

/// Polls `query` with exponential backoff until its result is available.
pub fn wait_for_query(
    ctx: &mut dyn RhiDeviceContext,
    query: &GpuQuery,
    wait: &QueryWait,
) -> Result<QueryData, QueryError> {
    poll_since(ctx, query, wait, Instant::now())
}

/// Polls `query` until `wait.timeout` after `started`.
fn poll_since(
    ctx: &mut dyn RhiDeviceContext,
    query: &GpuQuery,
    wait: &QueryWait,
    started: Instant,
) -> Result<QueryData, QueryError> {
    let mut interval = wait.poll_interval.max(Duration::from_micros(1));
    loop {
        if let Some(data) = ctx.query_data(query.handle())? {
            return Ok(data);
        }
        if wait.cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let elapsed = started.elapsed();
        if elapsed >= wait.timeout {
            return Err(QueryError::Timeout(elapsed));
        }
        std::thread::sleep(interval.min(wait.timeout - elapsed));
        interval = (interval * 2).min(MAX_POLL_INTERVAL);
    }
}

/// Waits for the three results and returns the interval in milliseconds.
///
/// `wait.timeout` bounds the three reads together.
pub fn resolve_timestamp_duration(
    ctx: &mut dyn RhiDeviceContext,
    queries: &TimestampQueries,
    wait: &QueryWait,
) -> Result<f64, QueryError> {
    let started = Instant::now();
    let (disjoint, frequency) = match poll_since(ctx, &queries.disjoint, wait, started)? {
        QueryData::Disjoint {
            disjoint,
            frequency,
        } => (disjoint, frequency),
        QueryData::Timestamp(_) => return Err(QueryError::WrongKind),
    };
    if disjoint {
        return Ok(0.0);
    }
    let start = read_ticks(ctx, &queries.start, wait, started)?;
    let end = read_ticks(ctx, &queries.end, wait, started)?;
    Ok(timestamp_duration_ms(false, frequency, start, end))
}

fn read_ticks(
    ctx: &mut dyn RhiDeviceContext,
    query: &GpuQuery,
    wait: &QueryWait,
    started: Instant,
) -> Result<u64, QueryError> {
    match poll_since(ctx, query, wait, started)? {
        QueryData::Timestamp(ticks) => Ok(ticks),
        QueryData::Disjoint { .. } => Err(QueryError::WrongKind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn duration_from_ticks() {
        assert_relative_eq!(
            timestamp_duration_ms(false, 1_000_000, 1_000_000, 2_500_000),
            1500.0
        );
    }

    #[test]
    fn disjoint_interval_measures_zero() {
        assert_relative_eq!(timestamp_duration_ms(true, 1_000_000, 0, 999_999_999), 0.0);
        assert_relative_eq!(timestamp_duration_ms(false, 0, 0, 10), 0.0);
    }

    #[test]
    fn reversed_ticks_do_not_underflow() {
        assert_relative_eq!(timestamp_duration_ms(false, 1000, 10, 5), 0.0);
    }
}
