// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-subsystem error taxonomy, mirroring the classification table in the
//! worker-handle and fan-out design: `CONNECTION_FAILED`/`BAD_IMPLEMENTATION`
//! are terminal, `FAILED`/`TIMEOUT` are per-call, `ABORTED` is a silent drop.

/// Outcome of a handle's `init()` attempt.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("connection failed after retry budget exhausted")]
    ConnectionFailed,
    #[error("worker reported a bad implementation: {0}")]
    BadImplementation(String),
    #[error("worker setup rejected, not retrying: {0}")]
    Rejected(String),
    #[error("init aborted: handle was closed")]
    Aborted,
    #[error("caller misused the handle API: {0}")]
    InvalidCoordinatorUsage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("control channel send failed: {0}")]
    Control(#[from] fleet_control::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}
