// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-rpc: the gRPC transport binding for the worker RPC surface.
//!
//! Hand-specified in the shape `tonic-build` would generate from the
//! `dynamic_subclass.proto` / `commons.proto` pair this mirrors, plus the
//! standard gRPC health-check client and the gateway auth interceptor.

pub mod auth;
pub mod client;
pub mod error;
pub mod health;
pub mod proto;

pub use auth::GatewayAuthInterceptor;
pub use client::DynamicSubclassServiceClient;
pub use error::Error;
pub use health::{check as health_check, is_unavailable, HealthCheckError};
pub use proto::commons::{Argument, KwArgument, Variant};
pub use proto::dynamic_subclass::{CallRequest, CallResponse, SetupRequest, SetupResponse};
