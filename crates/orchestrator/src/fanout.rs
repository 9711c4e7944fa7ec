// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent fan-out executor (component E) — the heart of the system.
//!
//! Invokes a named remote method across every currently-live worker with a
//! uniform per-call timeout, classifies each outcome, updates per-handle
//! counters, and drives eviction/reconnection through [`crate::cluster::ClusterState`].

use crate::cluster::ClusterState;
use crate::handle::WorkerHandle;
use fleet_control::FailureCode;
use fleet_core::{Argument, Variant, WorkerId};
use fleet_rpc::{CallRequest, DynamicSubclassServiceClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Eviction/skip thresholds, independently configurable per the design note
/// that "skip on many timeouts" and "evict on many timeouts" are distinct.
#[derive(Debug, Clone, Copy)]
pub struct FanoutPolicy {
    pub per_call_timeout: Duration,
    pub max_consecutive_failures: u32,
    pub max_consecutive_timeouts: u32,
    pub max_consecutive_timeouts_for_skip: u32,
}

impl Default for FanoutPolicy {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(30),
            max_consecutive_failures: 3,
            max_consecutive_timeouts: 3,
            max_consecutive_timeouts_for_skip: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Failed,
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub status: CallStatus,
    pub result: Option<Variant>,
    pub error: Option<String>,
    pub exec_time_us: u64,
}

impl InvocationResult {
    fn success(result: Variant, elapsed: Duration) -> Self {
        Self { status: CallStatus::Success, result: Some(result), error: None, exec_time_us: micros(elapsed) }
    }

    fn failed(error: String, elapsed: Duration) -> Self {
        Self { status: CallStatus::Failed, result: None, error: Some(error), exec_time_us: micros(elapsed) }
    }

    fn timeout(elapsed: Duration) -> Self {
        Self { status: CallStatus::Timeout, result: None, error: None, exec_time_us: micros(elapsed) }
    }

    /// The skipped-entry shape mandated for the timeout-skip path: status
    /// `TIMEOUT`, zero `exec_time_us` (the call was never dispatched).
    fn skipped() -> Self {
        Self { status: CallStatus::Timeout, result: None, error: None, exec_time_us: 0 }
    }
}

fn micros(d: Duration) -> u64 {
    d.as_micros().min(u128::from(u64::MAX)) as u64
}

/// Owns a back-reference into the membership manager so it can trigger
/// eviction/reconnection as fan-out outcomes dictate, per the design note
/// that the manager and executor are constructed together rather than via
/// a bidirectional ownership cycle.
pub struct FanoutExecutor {
    cluster: Arc<ClusterState>,
    policy: FanoutPolicy,
}

impl FanoutExecutor {
    pub fn new(cluster: Arc<ClusterState>, policy: FanoutPolicy) -> Self {
        Self { cluster, policy }
    }

    /// Fan a call out across the current live set. The returned map's key
    /// set equals the handles that were live at dispatch time, including
    /// any that were skipped rather than actually invoked.
    pub async fn call(
        &self,
        method_name: &str,
        args: &[Argument],
    ) -> HashMap<WorkerId, InvocationResult> {
        let snapshot = self.cluster.snapshot();
        let mut tasks = Vec::with_capacity(snapshot.len());

        for handle in snapshot {
            let method_name = method_name.to_string();
            let args = args.to_vec();
            let timeout = self.policy.per_call_timeout;
            let max_timeouts_for_skip = self.policy.max_consecutive_timeouts_for_skip;
            let cluster = self.cluster.clone();

            tasks.push(async move {
                if handle.consecutive_timeouts() >= max_timeouts_for_skip {
                    Self::spawn_skip_probe(cluster, handle.clone());
                    return (handle.id.clone(), InvocationResult::skipped());
                }
                let result = Self::dispatch_one(&handle, &cluster, &method_name, &args, timeout).await;
                (handle.id.clone(), result)
            });
        }

        let results = futures_util::future::join_all(tasks).await;
        let mut map = HashMap::with_capacity(results.len());
        for (id, result) in results {
            map.insert(id, result);
        }
        map
    }

    /// Launch (at most once in flight per handle) a health probe for a
    /// timeout-saturated handle. A probe reporting unavailable asks the
    /// membership manager to reconnect; a success leaves the skip state
    /// untouched — only a real successful call resets the timeout counter.
    fn spawn_skip_probe(cluster: Arc<ClusterState>, handle: Arc<WorkerHandle>) {
        if !handle.try_start_probe() {
            return;
        }
        tokio::spawn(async move {
            let Some(channel) = handle.channel() else {
                handle.finish_probe();
                return;
            };
            let probe = fleet_rpc::health_check(channel).await;
            handle.finish_probe();
            if let Err(e) = probe {
                if fleet_rpc::is_unavailable(&e) {
                    tracing::info!(worker_id = %handle.id, "health probe unavailable, reconnecting");
                    let _ = cluster.reconnect_model_runner(&handle.id).await;
                }
            }
        });
    }

    async fn dispatch_one(
        handle: &Arc<WorkerHandle>,
        cluster: &Arc<ClusterState>,
        method_name: &str,
        args: &[Argument],
        per_call_timeout: Duration,
    ) -> InvocationResult {
        let start = Instant::now();

        let Some(channel) = handle.channel() else {
            return InvocationResult::failed("no channel open".to_string(), start.elapsed());
        };

        let request = CallRequest {
            method_name: method_name.to_string(),
            method_arguments: args.iter().map(Into::into).collect(),
            method_kw_arguments: Vec::new(),
        };

        let call_future: std::pin::Pin<Box<dyn std::future::Future<Output = Result<tonic::Response<fleet_rpc::CallResponse>, tonic::Status>> + Send>> =
            match handle.auth_interceptor() {
                Some(auth) => {
                    let mut client =
                        DynamicSubclassServiceClient::with_interceptor(channel, (*auth).clone());
                    Box::pin(async move { client.call(request).await })
                }
                None => {
                    let mut client = DynamicSubclassServiceClient::new(channel);
                    Box::pin(async move { client.call(request).await })
                }
            };

        Self::run_call(handle, cluster, call_future, per_call_timeout, start).await
    }

    async fn run_call(
        handle: &Arc<WorkerHandle>,
        cluster: &Arc<ClusterState>,
        call_future: std::pin::Pin<Box<dyn std::future::Future<Output = Result<tonic::Response<fleet_rpc::CallResponse>, tonic::Status>> + Send>>,
        per_call_timeout: Duration,
        start: Instant,
    ) -> InvocationResult {
        let outcome = tokio::time::timeout(per_call_timeout, call_future).await;

        match outcome {
            Err(_elapsed) => {
                handle.register_timeout();
                InvocationResult::timeout(start.elapsed())
            }
            Ok(Ok(response)) => {
                handle.reset_failures();
                handle.reset_timeouts();
                let variant = response.into_inner().method_response.map(Into::into).unwrap_or(Variant::None);
                InvocationResult::success(variant, start.elapsed())
            }
            Ok(Err(status)) => Self::classify_status(handle, cluster, status, start.elapsed()).await,
        }
    }

    /// `BAD_IMPLEMENTATION` is terminal and reported exactly once, inline
    /// here rather than deferred to the post-call threshold pass — the
    /// other kinds only register a counter for `enforce_thresholds` to
    /// evaluate after the whole fan-out's results are known.
    async fn classify_status(
        handle: &Arc<WorkerHandle>,
        cluster: &Arc<ClusterState>,
        status: tonic::Status,
        elapsed: Duration,
    ) -> InvocationResult {
        match status.code() {
            tonic::Code::DeadlineExceeded | tonic::Code::ResourceExhausted => {
                handle.register_timeout();
                InvocationResult::timeout(elapsed)
            }
            tonic::Code::Unimplemented => {
                let reason = status.message().to_string();
                cluster
                    .process_failure(handle, FailureCode::BadImplementation, Some(reason.clone()))
                    .await;
                InvocationResult::failed(format!("bad implementation: {reason}"), elapsed)
            }
            _ => {
                handle.register_failure();
                InvocationResult::failed(status.message().to_string(), elapsed)
            }
        }
    }

    /// Applies the post-call threshold checks: crossing either counter's
    /// threshold on this call's completion triggers eviction exactly once.
    pub async fn enforce_thresholds(&self, results: &HashMap<WorkerId, InvocationResult>) {
        for handle in self.cluster.snapshot() {
            if !results.contains_key(&handle.id) {
                continue;
            }
            if handle.consecutive_failures() > self.policy.max_consecutive_failures {
                self.cluster
                    .process_failure(&handle, FailureCode::MultipleFailed, None)
                    .await;
                continue;
            }
            if handle.consecutive_timeouts() > self.policy.max_consecutive_timeouts {
                self.cluster
                    .process_failure(&handle, FailureCode::MultipleTimeout, None)
                    .await;
            }
        }
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
