// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleet-orchestrator: the client-side orchestrator for a dynamic fleet of
//! remote model-runner workers.
//!
//! Ties together the control-channel client ([`fleet_control`]), the
//! worker RPC binding ([`fleet_rpc`]), and this crate's own three
//! subsystems: the worker handle and its connect-with-retry lifecycle
//! ([`handle`]), the cluster membership manager ([`cluster`]), and the
//! concurrent fan-out executor ([`fanout`]).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cluster;
pub mod config;
pub mod error;
pub mod fanout;
pub mod handle;

pub use cluster::ClusterState;
pub use config::{Config, ConfigError, SecureCredentials};
pub use error::{ClusterError, FanoutError, HandleError};
pub use fanout::{CallStatus, FanoutExecutor, FanoutPolicy, InvocationResult};
pub use handle::{BasicVariant, DynamicSubclassVariant, HandleVariant, RetryPolicy, TlsMaterial, WorkerHandle};

use fleet_control::{ControlChannelClient, MembershipEvent, ReconnectPolicy};
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::sync::Arc;

/// The fully assembled orchestrator: owns the control-channel client, the
/// membership manager it feeds, and the fan-out executor built on top.
///
/// Per the design note that the executor holds a back-reference into the
/// manager rather than the two owning each other, `Orchestrator` is the
/// single owner both are constructed from.
pub struct Orchestrator {
    control: ControlChannelClient,
    cluster: Arc<ClusterState>,
    executor: FanoutExecutor,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Self {
        let url = format!("ws://{}:{}/cluster/{}", config.host, config.port, config.crunch_id);
        let reconnect_policy = ReconnectPolicy {
            backoff_base: config.retry_backoff_base,
            min_retry_interval: config.min_retry_interval,
        };
        let control = ControlChannelClient::spawn(url, reconnect_policy);

        let retry_policy = RetryPolicy {
            retry_attempts: config.retry_attempts,
            retry_backoff_base: config.retry_backoff_base,
            min_retry_interval: config.min_retry_interval,
        };

        let auth_key = config.auth_private_key_path.as_deref().and_then(load_auth_key);
        let tls = config.secure_credentials.as_ref().and_then(load_tls_material);

        let cluster = Arc::new(ClusterState::new(
            control.outbound_handle(),
            retry_policy,
            auth_key,
            tls,
            config.report_failure,
        ));

        let fanout_policy = FanoutPolicy {
            per_call_timeout: config.timeout,
            max_consecutive_failures: config.max_consecutive_failures,
            max_consecutive_timeouts: config.max_consecutive_timeouts,
            max_consecutive_timeouts_for_skip: config.max_consecutive_timeouts_for_skip,
        };
        let executor = FanoutExecutor::new(cluster.clone(), fanout_policy);

        Self { control, cluster, executor }
    }

    /// Drive the control channel: apply every incoming event to the
    /// membership manager until the channel is dropped. Runs for the
    /// lifetime of the orchestrator; callers typically spawn this.
    pub async fn run(&mut self) {
        while let Some(event) = self.control.next_event().await {
            match event {
                MembershipEvent::Init(records) => self.cluster.apply_init(records).await,
                MembershipEvent::Update(records) => self.cluster.apply_update(records).await,
            }
        }
    }

    pub async fn call(
        &self,
        method_name: &str,
        args: &[fleet_core::Argument],
    ) -> std::collections::HashMap<fleet_core::WorkerId, InvocationResult> {
        let results = self.executor.call(method_name, args).await;
        self.executor.enforce_thresholds(&results).await;
        results
    }

    pub fn cluster(&self) -> &Arc<ClusterState> {
        &self.cluster
    }
}

/// Reads and decodes the PEM-encoded RSA private key used to sign outbound
/// `x-gateway-auth-*` headers. Logs and falls back to unauthenticated calls
/// on any I/O or parse failure rather than aborting startup.
fn load_auth_key(path: &str) -> Option<RsaPrivateKey> {
    match RsaPrivateKey::read_pkcs8_pem_file(path) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::error!(path, error = %e, "failed to load gateway auth private key, proceeding unauthenticated");
            None
        }
    }
}

/// Reads the mTLS material named by [`SecureCredentials`]. Logs and falls
/// back to plaintext channels on any I/O failure rather than aborting
/// startup.
fn load_tls_material(creds: &SecureCredentials) -> Option<TlsMaterial> {
    match TlsMaterial::load(creds) {
        Ok(tls) => Some(tls),
        Err(e) => {
            tracing::error!(error = %e, "failed to load mTLS credentials, proceeding without TLS");
            None
        }
    }
}
