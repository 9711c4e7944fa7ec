// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster membership manager (component D) — applies `init`/`update`
//! events to the live worker set and drives add/remove/reconnect.

use crate::error::{ClusterError, HandleError};
use crate::handle::{BasicVariant, HandleVariant, RetryPolicy, TlsMaterial, WorkerHandle};
use fleet_control::{encode_report_failure, FailureCode, OutboundSender, RunState, WorkerRecord};
use fleet_core::WorkerId;
use fleet_rpc::GatewayAuthInterceptor;
use parking_lot::RwLock;
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::Arc;

/// The live worker set. Mutated only by the event-handling methods below
/// and by the eviction actions they originate; fan-out readers take a
/// cheap `Arc`-cloned snapshot per request.
pub struct ClusterState {
    workers: RwLock<HashMap<WorkerId, Arc<WorkerHandle>>>,
    outbound: OutboundSender,
    retry_policy: RetryPolicy,
    auth_key: Option<RsaPrivateKey>,
    tls: Option<TlsMaterial>,
    report_failure_enabled: bool,
}

impl ClusterState {
    /// `auth_key`, when present, signs an interceptor built fresh for each
    /// worker (the signed payload carries that worker's id), matching the
    /// per-model-runner `GatewayAuthClientInterceptor` this was distilled
    /// from rather than one interceptor shared across every channel.
    /// `tls`, when present, upgrades every worker channel to mTLS.
    pub fn new(
        outbound: OutboundSender,
        retry_policy: RetryPolicy,
        auth_key: Option<RsaPrivateKey>,
        tls: Option<TlsMaterial>,
        report_failure_enabled: bool,
    ) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            outbound,
            retry_policy,
            auth_key,
            tls,
            report_failure_enabled,
        }
    }

    fn auth_interceptor_for(&self, id: &WorkerId) -> Option<Arc<GatewayAuthInterceptor>> {
        self.auth_key.clone().map(|key| Arc::new(GatewayAuthInterceptor::new(key, id.as_str())))
    }

    /// A consistent, `Arc`-shared point-in-time view of the live set.
    pub fn snapshot(&self) -> Vec<Arc<WorkerHandle>> {
        self.workers.read().values().cloned().collect()
    }

    pub fn get(&self, id: &WorkerId) -> Option<Arc<WorkerHandle>> {
        self.workers.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }

    /// Authoritative full snapshot: apply per-record logic, then evict any
    /// handle whose id is absent from the snapshot.
    pub async fn apply_init(&self, records: Vec<WorkerRecord>) {
        let incoming: std::collections::HashSet<WorkerId> =
            records.iter().map(|r| WorkerId::from_string(&r.model_id)).collect();

        self.apply_records(records).await;

        let stale: Vec<Arc<WorkerHandle>> = {
            let workers = self.workers.read();
            workers
                .iter()
                .filter(|(id, _)| !incoming.contains(*id))
                .map(|(_, h)| h.clone())
                .collect()
        };
        for handle in stale {
            tracing::info!(worker_id = %handle.id, "evicting worker absent from init snapshot");
            self.remove(&handle.id);
            handle.close();
        }
    }

    /// Incremental delta: apply per-record logic only.
    pub async fn apply_update(&self, records: Vec<WorkerRecord>) {
        self.apply_records(records).await;
    }

    async fn apply_records(&self, records: Vec<WorkerRecord>) {
        let tasks: Vec<_> = records.into_iter().map(|record| self.apply_record(record)).collect();
        futures_util::future::join_all(tasks).await;
    }

    /// Per-record logic table from the membership manager's design:
    ///
    /// | current | incoming | action |
    /// |---|---|---|
    /// | absent  | RUNNING | create handle, init() concurrently; insert on success |
    /// | absent  | STOPPED | no-op |
    /// | present | RUNNING | overwrite infos, keep identity |
    /// | present | STOPPED | close + remove |
    async fn apply_record(&self, record: WorkerRecord) {
        let id = WorkerId::from_string(&record.model_id);
        let existing = self.get(&id);

        match (existing, record.state) {
            (None, RunState::Running) => self.add_worker(id, record).await,
            (None, RunState::Stopped) => {}
            (Some(handle), RunState::Running) => handle.update_infos(record.infos),
            (Some(handle), RunState::Stopped) => {
                self.remove(&id);
                handle.close();
            }
        }
    }

    async fn add_worker(&self, id: WorkerId, record: WorkerRecord) {
        let variant: Arc<dyn HandleVariant> = Arc::new(BasicVariant);
        let auth = self.auth_interceptor_for(&id);
        let handle = Arc::new(WorkerHandle::new_with_tls(
            id.clone(),
            record.ip,
            record.port,
            record.infos,
            variant,
            self.retry_policy,
            auth,
            self.tls.clone(),
        ));

        match handle.init().await {
            Ok(()) => {
                self.workers.write().insert(id, handle);
            }
            Err(HandleError::ConnectionFailed) => {
                self.process_failure(&handle, FailureCode::ConnectionFailed, None).await;
            }
            Err(HandleError::BadImplementation(reason)) => {
                self.process_failure(&handle, FailureCode::BadImplementation, Some(reason)).await;
            }
            Err(HandleError::Aborted) => {
                tracing::info!(worker_id = %handle.id, "init aborted, dropping silently");
            }
            Err(HandleError::InvalidCoordinatorUsage(msg)) => {
                tracing::error!(worker_id = %handle.id, %msg, "invalid coordinator usage during setup");
            }
            Err(HandleError::Rejected(reason)) => {
                self.process_failure(&handle, FailureCode::ConnectionFailed, Some(reason)).await;
            }
        }
    }

    fn remove(&self, id: &WorkerId) {
        self.workers.write().remove(id);
    }

    /// Test-only seam for installing a handle without going through
    /// `apply_init`/`apply_update` — lets fan-out tests set up counter
    /// states that a real connect-with-retry wouldn't reach.
    #[cfg(test)]
    pub(crate) fn insert_for_test(&self, handle: Arc<WorkerHandle>) {
        self.workers.write().insert(handle.id.clone(), handle);
    }

    /// Reports the failure to the control plane (unless suppressed for
    /// testing) and evicts the handle. Called by the fan-out executor on
    /// terminal per-call outcomes and by this manager on add-time failures.
    pub async fn process_failure(
        &self,
        handle: &WorkerHandle,
        code: FailureCode,
        reason: Option<String>,
    ) {
        if self.report_failure_enabled {
            let frame = encode_report_failure(handle.id.as_str(), &handle.host, code, reason);
            if let Err(e) = self.outbound.send(frame).await {
                tracing::warn!(worker_id = %handle.id, error = %e, "failed to send report_failure");
            }
        }
        self.remove(&handle.id);
        handle.close();
    }

    /// Close the existing channel and re-run `init()`; resets counters on
    /// success. Used by the timeout-skip health-probe path.
    pub async fn reconnect_model_runner(&self, id: &WorkerId) -> Result<(), ClusterError> {
        let Some(handle) = self.get(id) else {
            return Ok(());
        };
        handle.close();
        // `close()` sets the permanent latch; reconnects replace the handle
        // object entirely rather than resurrecting a closed one, matching
        // "death is permanent for that handle object".
        let fresh = Arc::new(WorkerHandle::new_with_tls(
            handle.id.clone(),
            handle.host.clone(),
            handle.port,
            handle.infos(),
            Arc::new(BasicVariant),
            self.retry_policy,
            handle.auth_interceptor(),
            self.tls.clone(),
        ));
        match fresh.init().await {
            Ok(()) => {
                self.workers.write().insert(id.clone(), fresh);
            }
            Err(_) => {
                self.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
