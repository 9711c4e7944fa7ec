// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-control: the WebSocket control-channel client.
//!
//! Carries the authoritative `init`/`update` membership stream in, and
//! `report_failure` envelopes out. Reconnection policy is shared with the
//! worker handle's connect-with-retry loop via [`fleet_core::backoff_duration`].

pub mod client;
pub mod error;
pub mod event;

pub use client::{ControlChannelClient, OutboundSender, ReconnectPolicy};
pub use error::Error;
pub use event::{decode_event, encode_report_failure, DecodeError, FailureCode, MembershipEvent, RunState, WorkerRecord};
