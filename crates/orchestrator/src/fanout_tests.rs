// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_control::{ControlChannelClient, ReconnectPolicy};
use std::collections::BTreeMap;

fn test_executor() -> (Arc<ClusterState>, FanoutExecutor) {
    let control =
        ControlChannelClient::spawn("ws://127.0.0.1:1/cluster/test".to_string(), ReconnectPolicy::default());
    let outbound = control.outbound_handle();
    drop(control);
    let cluster =
        Arc::new(ClusterState::new(outbound, crate::handle::RetryPolicy::default(), None, None, false));
    let executor = FanoutExecutor::new(cluster.clone(), FanoutPolicy::default());
    (cluster, executor)
}

fn unconnected_handle(suffix: &str) -> Arc<WorkerHandle> {
    Arc::new(WorkerHandle::new(
        WorkerId::from_string(format!("wkr-{suffix}")),
        "127.0.0.1".to_string(),
        1,
        BTreeMap::new(),
        Arc::new(crate::handle::BasicVariant),
        crate::handle::RetryPolicy::default(),
        None,
    ))
}

#[tokio::test]
async fn call_over_empty_cluster_returns_empty_map() {
    let (_cluster, executor) = test_executor();
    let results = executor.call("ping", &[]).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn handle_with_no_open_channel_is_reported_failed_not_panicking() {
    let (cluster, executor) = test_executor();
    let handle = unconnected_handle("nochannel000000000");
    cluster.insert_for_test(handle.clone());

    let results = executor.call("ping", &[]).await;

    let result = results.get(&handle.id).expect("handle present in results");
    assert_eq!(result.status, CallStatus::Failed);
    assert_eq!(handle.consecutive_failures(), 1);
}

#[tokio::test]
async fn timeout_saturated_handle_is_skipped_and_reported_as_timeout() {
    let (cluster, executor) = test_executor();
    let handle = unconnected_handle("saturated00000000000");
    handle.register_timeout();
    handle.register_timeout();
    handle.register_timeout();
    cluster.insert_for_test(handle.clone());

    let results = executor.call("ping", &[]).await;

    let result = results.get(&handle.id).expect("handle present in results");
    assert_eq!(result.status, CallStatus::Timeout);
    assert_eq!(result.exec_time_us, 0);
    // The skip path doesn't touch the counter directly; only a real
    // success (never reached here, no channel) would reset it.
    assert_eq!(handle.consecutive_timeouts(), 3);
}

#[tokio::test]
async fn enforce_thresholds_evicts_after_max_consecutive_failures() {
    let (cluster, executor) = test_executor();
    let handle = unconnected_handle("repeatfail000000000");
    cluster.insert_for_test(handle.clone());
    for _ in 0..=FanoutPolicy::default().max_consecutive_failures {
        handle.register_failure();
    }

    let mut results = HashMap::new();
    results.insert(handle.id.clone(), InvocationResult::failed("x".to_string(), Duration::from_millis(1)));
    executor.enforce_thresholds(&results).await;

    assert!(cluster.get(&handle.id).is_none());
}

#[tokio::test]
async fn enforce_thresholds_does_not_evict_below_threshold() {
    let (cluster, executor) = test_executor();
    let handle = unconnected_handle("singlefail000000000");
    cluster.insert_for_test(handle.clone());
    handle.register_failure();

    let mut results = HashMap::new();
    results.insert(handle.id.clone(), InvocationResult::failed("x".to_string(), Duration::from_millis(1)));
    executor.enforce_thresholds(&results).await;

    assert!(cluster.get(&handle.id).is_some());
}

#[tokio::test]
async fn enforce_thresholds_ignores_handles_absent_from_results() {
    let (cluster, executor) = test_executor();
    let handle = unconnected_handle("notdispatched000000");
    cluster.insert_for_test(handle.clone());
    for _ in 0..10 {
        handle.register_failure();
    }

    executor.enforce_thresholds(&HashMap::new()).await;

    // Wasn't part of this fan-out's result set, so it isn't touched even
    // though its counter is already well past the threshold.
    assert!(cluster.get(&handle.id).is_some());
}
