// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker handle and its connect-with-retry lifecycle controller
//! (components B and C).

use crate::config::SecureCredentials;
use crate::error::HandleError;
use async_trait::async_trait;
use fleet_core::{backoff_duration, WorkerId};
use fleet_rpc::{GatewayAuthInterceptor, SetupRequest};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity};

/// mTLS material read once at startup from [`SecureCredentials`]'s paths;
/// cheap to clone per connect attempt since `tonic`'s TLS types just hold
/// the decoded PEM bytes.
#[derive(Clone)]
pub struct TlsMaterial {
    ca: Certificate,
    identity: Identity,
}

impl TlsMaterial {
    pub fn load(creds: &SecureCredentials) -> std::io::Result<Self> {
        let ca = std::fs::read(&creds.ca_path)?;
        let cert = std::fs::read(&creds.cert_path)?;
        let key = std::fs::read(&creds.key_path)?;
        Ok(Self { ca: Certificate::from_pem(ca), identity: Identity::from_pem(cert, key) })
    }
}

/// Connect-policy knobs, one set per handle (defaults match the teacher's
/// distilled system: 5 attempts, base 2, 2s floor).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retry_attempts: u32,
    pub retry_backoff_base: f64,
    pub min_retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retry_attempts: 5, retry_backoff_base: 2.0, min_retry_interval: Duration::from_secs(2) }
    }
}

/// The polymorphic per-variant handshake hook. Shared counter/lifecycle
/// logic in [`WorkerHandle`] is the same for every variant; only the
/// handshake performed right after the channel connects differs.
#[async_trait]
pub trait HandleVariant: Send + Sync {
    async fn setup(&self, channel: Channel) -> Result<(), HandleError>;
}

/// The variant used when the worker exposes no extra handshake beyond the
/// bare RPC channel being reachable.
#[derive(Debug, Default)]
pub struct BasicVariant;

#[async_trait]
impl HandleVariant for BasicVariant {
    async fn setup(&self, _channel: Channel) -> Result<(), HandleError> {
        Ok(())
    }
}

/// The variant that performs a `Setup(className, args, kwargs)` call before
/// declaring the worker ready, mirroring `DynamicSubclassModelRunner`.
#[derive(Debug)]
pub struct DynamicSubclassVariant {
    pub class_name: String,
    pub instance_arguments: Vec<fleet_rpc::Argument>,
}

#[async_trait]
impl HandleVariant for DynamicSubclassVariant {
    async fn setup(&self, channel: Channel) -> Result<(), HandleError> {
        let mut client = fleet_rpc::DynamicSubclassServiceClient::new(channel);
        let request = SetupRequest {
            class_name: self.class_name.clone(),
            instance_arguments: self.instance_arguments.clone(),
            instance_kw_arguments: Vec::new(),
        };
        client.setup(request).await.map_err(|status| {
            if status.code() == tonic::Code::Unimplemented {
                return HandleError::BadImplementation(status.message().to_string());
            }
            let message = status.message().to_string();
            if fleet_rpc::Error::from(status).is_transient() {
                HandleError::ConnectionFailed
            } else {
                HandleError::Rejected(message)
            }
        })?;
        Ok(())
    }
}

/// One worker's connection, metadata, counters, and lifecycle state.
pub struct WorkerHandle {
    pub id: WorkerId,
    pub host: String,
    pub port: u16,
    infos: RwLock<BTreeMap<String, String>>,
    channel: RwLock<Option<Channel>>,
    consecutive_failures: AtomicU32,
    consecutive_timeouts: AtomicU32,
    closed: AtomicBool,
    probe_in_flight: AtomicBool,
    variant: Arc<dyn HandleVariant>,
    policy: RetryPolicy,
    auth: Option<Arc<GatewayAuthInterceptor>>,
    tls: Option<TlsMaterial>,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("closed", &self.is_closed())
            .field("consecutive_failures", &self.consecutive_failures())
            .field("consecutive_timeouts", &self.consecutive_timeouts())
            .finish()
    }
}

impl WorkerHandle {
    pub fn new(
        id: WorkerId,
        host: String,
        port: u16,
        infos: BTreeMap<String, String>,
        variant: Arc<dyn HandleVariant>,
        policy: RetryPolicy,
        auth: Option<Arc<GatewayAuthInterceptor>>,
    ) -> Self {
        Self::new_with_tls(id, host, port, infos, variant, policy, auth, None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_with_tls(
        id: WorkerId,
        host: String,
        port: u16,
        infos: BTreeMap<String, String>,
        variant: Arc<dyn HandleVariant>,
        policy: RetryPolicy,
        auth: Option<Arc<GatewayAuthInterceptor>>,
        tls: Option<TlsMaterial>,
    ) -> Self {
        Self {
            id,
            host,
            port,
            infos: RwLock::new(infos),
            channel: RwLock::new(None),
            consecutive_failures: AtomicU32::new(0),
            consecutive_timeouts: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            probe_in_flight: AtomicBool::new(false),
            variant,
            policy,
            auth,
            tls,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn infos(&self) -> BTreeMap<String, String> {
        self.infos.read().clone()
    }

    /// `present, RUNNING` keeps identity/channel/counters, replaces `infos` only.
    pub fn update_infos(&self, infos: BTreeMap<String, String>) {
        *self.infos.write() = infos;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts.load(Ordering::SeqCst)
    }

    pub fn register_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn register_timeout(&self) -> u32 {
        self.consecutive_timeouts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn reset_timeouts(&self) {
        self.consecutive_timeouts.store(0, Ordering::SeqCst);
    }

    /// Guards the health probe launched from the timeout-skip path so at
    /// most one runs per handle at a time. Returns `true` if this caller
    /// acquired the guard.
    pub fn try_start_probe(&self) -> bool {
        self.probe_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish_probe(&self) {
        self.probe_in_flight.store(false, Ordering::SeqCst);
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel.read().clone()
    }

    /// Connect-with-retry. Never runs concurrently with itself on the same
    /// handle in normal use (the membership manager serializes add/reconnect
    /// per id), so no internal init-guard lock is needed beyond the closed
    /// latch check each iteration.
    pub async fn init(&self) -> Result<(), HandleError> {
        for attempt in 1..=self.policy.retry_attempts {
            if self.is_closed() {
                return Err(HandleError::Aborted);
            }

            let scheme = if self.tls.is_some() { "https" } else { "http" };
            let endpoint = format!("{}://{}:{}", scheme, self.host, self.port);
            let channel = match Channel::from_shared(endpoint) {
                Ok(builder) => match self.apply_tls(builder) {
                    Ok(builder) => builder.connect().await,
                    Err(e) => {
                        tracing::warn!(worker_id = %self.id, error = %e, "invalid tls configuration");
                        return Err(HandleError::ConnectionFailed);
                    }
                },
                Err(e) => {
                    tracing::warn!(worker_id = %self.id, error = %e, "invalid worker endpoint");
                    return Err(HandleError::ConnectionFailed);
                }
            };

            let channel = match channel {
                Ok(channel) => channel,
                Err(e) => {
                    let delay = backoff_duration(
                        self.policy.retry_backoff_base,
                        self.policy.min_retry_interval,
                        attempt,
                    );
                    tracing::warn!(
                        worker_id = %self.id, attempt, error = %e, ?delay,
                        "worker connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            match self.variant.setup(channel.clone()).await {
                Ok(()) => {
                    if self.is_closed() {
                        // A close() raced this init(); honor it rather than
                        // leaving a channel open on a handle declared dead.
                        return Err(HandleError::Aborted);
                    }
                    *self.channel.write() = Some(channel);
                    tracing::info!(worker_id = %self.id, attempt, "worker ready");
                    return Ok(());
                }
                Err(HandleError::BadImplementation(msg)) => {
                    tracing::warn!(worker_id = %self.id, %msg, "worker setup: bad implementation");
                    return Err(HandleError::BadImplementation(msg));
                }
                Err(HandleError::InvalidCoordinatorUsage(msg)) => {
                    return Err(HandleError::InvalidCoordinatorUsage(msg));
                }
                Err(HandleError::Rejected(msg)) => {
                    tracing::warn!(worker_id = %self.id, %msg, "worker setup rejected, not retrying");
                    return Err(HandleError::Rejected(msg));
                }
                Err(_) => {
                    let delay = backoff_duration(
                        self.policy.retry_backoff_base,
                        self.policy.min_retry_interval,
                        attempt,
                    );
                    tracing::warn!(worker_id = %self.id, attempt, ?delay, "worker setup failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(HandleError::ConnectionFailed)
    }

    fn apply_tls(&self, endpoint: tonic::transport::Endpoint) -> Result<tonic::transport::Endpoint, tonic::transport::Error> {
        let Some(tls) = &self.tls else {
            return Ok(endpoint);
        };
        let tls_config = ClientTlsConfig::new()
            .ca_certificate(tls.ca.clone())
            .identity(tls.identity.clone())
            .domain_name(self.host.clone());
        endpoint.tls_config(tls_config)
    }

    /// Idempotent: sets the closed latch and drops the channel if present.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.channel.write().take();
    }

    pub fn auth_interceptor(&self) -> Option<Arc<GatewayAuthInterceptor>> {
        self.auth.clone()
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
