// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shapes for the control channel's JSON event envelopes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One worker's advertised state, as carried in an `init`/`update` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    Running,
    Stopped,
}

/// A single per-worker record inside an `init` or `update` event.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkerRecord {
    pub model_id: String,
    pub state: RunState,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub infos: BTreeMap<String, String>,
}

/// A decoded inbound control-channel event.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipEvent {
    /// Authoritative full snapshot — any worker absent from it must be evicted.
    Init(Vec<WorkerRecord>),
    /// Incremental delta, applied record-by-record.
    Update(Vec<WorkerRecord>),
}

/// Raw `{"event": ..., "data": [...]}` envelope as it appears on the wire.
#[derive(Debug, Deserialize, Serialize)]
struct RawEnvelope {
    event: String,
    data: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed control-channel frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized event kind: {0:?}")]
    UnknownEvent(String),
}

/// Decode one text frame into a [`MembershipEvent`].
///
/// Unrecognized `event` kinds are reported rather than silently dropped;
/// the caller decides whether to log-and-continue (the normal policy) or
/// treat it as fatal.
pub fn decode_event(frame: &str) -> Result<MembershipEvent, DecodeError> {
    let raw: RawEnvelope = serde_json::from_str(frame)?;
    let records: Vec<WorkerRecord> = serde_json::from_value(raw.data)?;
    match raw.event.as_str() {
        "init" => Ok(MembershipEvent::Init(records)),
        "update" => Ok(MembershipEvent::Update(records)),
        other => Err(DecodeError::UnknownEvent(other.to_string())),
    }
}

/// Failure codes reported back to the control plane via `report_failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    BadImplementation,
    ConnectionFailed,
    MultipleFailed,
    MultipleTimeout,
}

#[derive(Debug, Clone, Serialize)]
struct FailureRecord {
    model_id: String,
    failure_code: FailureCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    ip: String,
}

/// Build the outbound `report_failure` envelope text for one worker.
pub fn encode_report_failure(
    worker_id: &str,
    ip: &str,
    code: FailureCode,
    reason: Option<String>,
) -> String {
    #[derive(Serialize)]
    struct Envelope {
        event: &'static str,
        data: [FailureRecord; 1],
    }

    let envelope = Envelope {
        event: "report_failure",
        data: [FailureRecord {
            model_id: worker_id.to_string(),
            failure_code: code,
            failure_reason: reason,
            ip: ip.to_string(),
        }],
    };

    // Serializing a value built from owned Strings and a fixed-shape
    // struct cannot fail; swallowing an unreachable error here would be
    // the only alternative to unwrap, which non-test code may not use.
    match serde_json::to_string(&envelope) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize report_failure envelope");
            String::new()
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
