// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standard gRPC Health Checking Protocol probe, used by the fan-out
//! executor's timeout-skip path to decide whether a saturated handle
//! should be reconnected.

use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tonic_health::ServingStatus;

#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    #[error("health check RPC failed: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("worker reported not serving")]
    NotServing,
}

/// Run one health check against a worker's channel.
///
/// Returns `Ok(())` only when the worker reports `SERVING`; any other
/// status (or an `unavailable` RPC error) is surfaced as a reconnect signal
/// to the caller.
pub async fn check(channel: tonic::transport::Channel) -> Result<(), HealthCheckError> {
    let mut client = HealthClient::new(channel);
    let response = client
        .check(HealthCheckRequest { service: String::new() })
        .await?
        .into_inner();

    if response.status() == ServingStatus::Serving {
        Ok(())
    } else {
        Err(HealthCheckError::NotServing)
    }
}

/// `true` exactly when the failure should trigger `reconnect_model_runner`
/// (an `unavailable` status, per the classification table in §4.E).
pub fn is_unavailable(err: &HealthCheckError) -> bool {
    match err {
        HealthCheckError::Rpc(status) => status.code() == tonic::Code::Unavailable,
        HealthCheckError::NotServing => true,
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
