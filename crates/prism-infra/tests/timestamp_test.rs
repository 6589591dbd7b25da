mod common;

use approx::assert_relative_eq;
use common::{headless, Fixture};
use prism_core::rhi::error::QueryError;
use prism_core::rhi::query::QueryWait;
use prism_core::rhi::{RhiError, RhiSettings};
use prism_core::sync::CancellationToken;
use prism_infra::graphics::headless::{HeadlessConfig, ObjectKind};
use std::time::{Duration, Instant};

fn wait(timeout: Duration) -> QueryWait {
    QueryWait {
        timeout,
        poll_interval: Duration::from_micros(20),
        cancel: CancellationToken::new(),
    }
}

fn fixture(config: HeadlessConfig) -> Fixture {
    Fixture::with(RhiSettings::default(), config)
}

#[test]
fn interval_is_measured_in_milliseconds() {
    let fx = fixture(HeadlessConfig {
        timestamp_frequency: 1_000_000,
        ticks_per_timestamp: 500,
        query_ready_after_polls: 2,
        ..HeadlessConfig::default()
    });
    let mut list = fx.recording("timing");
    let queries = list.create_timestamp_queries().unwrap();

    list.timestamp_start(&queries).unwrap();
    list.timestamp_end(&queries).unwrap();
    let ms = list
        .timestamp_get_duration(&queries, &wait(Duration::from_secs(1)))
        .unwrap();

    assert_relative_eq!(ms, 0.5);
}

#[test]
fn disjoint_interval_measures_zero() {
    let fx = fixture(HeadlessConfig {
        disjoint: true,
        ..HeadlessConfig::default()
    });
    let mut list = fx.recording("disjoint");
    let queries = list.create_timestamp_queries().unwrap();

    list.timestamp_start(&queries).unwrap();
    list.timestamp_end(&queries).unwrap();

    let ms = list
        .timestamp_get_duration(&queries, &wait(Duration::from_secs(1)))
        .unwrap();
    assert_relative_eq!(ms, 0.0);
}

#[test]
fn unresolved_query_times_out() {
    let fx = fixture(HeadlessConfig {
        query_ready_after_polls: u32::MAX,
        ..HeadlessConfig::default()
    });
    let mut list = fx.recording("timeout");
    let queries = list.create_timestamp_queries().unwrap();
    list.timestamp_start(&queries).unwrap();
    list.timestamp_end(&queries).unwrap();

    let err = list
        .timestamp_get_duration(&queries, &wait(Duration::from_millis(20)))
        .unwrap_err();

    assert!(matches!(err, RhiError::Query(QueryError::Timeout(_))), "{err}");
}

#[test]
fn timeout_bounds_all_three_reads_together() {
    let fx = fixture(HeadlessConfig {
        query_ready_after_polls: 40,
        ..HeadlessConfig::default()
    });
    let mut list = fx.recording("slow_then_stuck");
    let queries = list.create_timestamp_queries().unwrap();
    list.timestamp_start(&queries).unwrap();
    list.timestamp_end(&queries).unwrap();
    headless(&mut list).stall_query(queries.end.handle());
    let timeout = Duration::from_millis(150);

    let started = Instant::now();
    let err = list
        .timestamp_get_duration(&queries, &wait(timeout))
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, RhiError::Query(QueryError::Timeout(_))), "{err}");
    assert!(
        elapsed < timeout + Duration::from_millis(100),
        "waited {elapsed:?} for a {timeout:?} timeout"
    );
}

#[test]
fn cancelled_wait_gives_up() {
    let fx = fixture(HeadlessConfig {
        query_ready_after_polls: u32::MAX,
        ..HeadlessConfig::default()
    });
    let mut list = fx.recording("cancel");
    let queries = list.create_timestamp_queries().unwrap();
    list.timestamp_start(&queries).unwrap();
    list.timestamp_end(&queries).unwrap();
    let wait = wait(Duration::from_secs(30));
    wait.cancel.cancel();

    let err = list.timestamp_get_duration(&queries, &wait).unwrap_err();

    assert_eq!(err, RhiError::Query(QueryError::Cancelled));
}

#[test]
fn query_creation_failure_is_reported() {
    let fx = fixture(HeadlessConfig {
        fail_query_creation: true,
        ..HeadlessConfig::default()
    });
    let list = fx.recording("no_queries");

    let err = list.create_timestamp_queries().unwrap_err();

    assert!(matches!(err, RhiError::Query(QueryError::CreationFailed(_))));
}

#[test]
fn queries_are_released_on_drop() {
    let fx = Fixture::new();
    let list = fx.recording("release");

    let queries = list.create_timestamp_queries().unwrap();
    assert_eq!(fx.device.live_objects_of(ObjectKind::Query), 3);
    drop(queries);
    assert_eq!(fx.device.live_objects_of(ObjectKind::Query), 0);
}

#[test]
fn commands_fail_once_the_context_is_gone() {
    let fx = Fixture::new();
    let list = fx.recording("orphan");
    let Fixture { context, .. } = fx;
    drop(context);

    assert_eq!(list.create_timestamp_queries().unwrap_err(), RhiError::DeviceLost);
    assert_eq!(list.gpu_memory_used_mb(), 0);
}
