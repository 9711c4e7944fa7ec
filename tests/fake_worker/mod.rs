// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal `dynamic_subclass.DynamicSubclassService` double.
//!
//! Hand-rolled the way [`fleet_rpc::client`] is hand-rolled against the
//! shape `tonic-build` would generate — here for the server side, since no
//! `.proto` build step runs in this workspace. Good enough to drive the
//! fan-out executor's classification paths (success, `Unimplemented`,
//! generic failure, a hung call) and the health-probe reconnect path,
//! without pulling in a real model-runner process.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_core::Variant;
use fleet_rpc::{CallRequest, CallResponse, SetupRequest, SetupResponse};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tonic::codegen::*;
use tonic_health::ServingStatus;

/// What the fake worker's `Call` RPC should do for the next request.
#[derive(Clone, Debug)]
pub enum CallMode {
    Success(Variant),
    Unimplemented,
    Failure,
    Hang(Duration),
}

struct State {
    mode: RwLock<CallMode>,
    calls: AtomicUsize,
}

async fn handle_setup(_request: tonic::Request<SetupRequest>) -> Result<tonic::Response<SetupResponse>, tonic::Status> {
    Ok(tonic::Response::new(SetupResponse {}))
}

async fn handle_call(
    state: Arc<State>,
    _request: tonic::Request<CallRequest>,
) -> Result<tonic::Response<CallResponse>, tonic::Status> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    let mode = state.mode.read().clone();
    match mode {
        CallMode::Success(value) => {
            Ok(tonic::Response::new(CallResponse { method_response: Some((&value).into()) }))
        }
        CallMode::Unimplemented => Err(tonic::Status::unimplemented("method not implemented by this worker")),
        CallMode::Failure => Err(tonic::Status::internal("simulated worker failure")),
        CallMode::Hang(delay) => {
            tokio::time::sleep(delay).await;
            Ok(tonic::Response::new(CallResponse { method_response: None }))
        }
    }
}

struct SetupSvc;

impl tonic::server::UnaryService<SetupRequest> for SetupSvc {
    type Response = SetupResponse;
    type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<SetupRequest>) -> Self::Future {
        Box::pin(handle_setup(request))
    }
}

struct CallSvc(Arc<State>);

impl tonic::server::UnaryService<CallRequest> for CallSvc {
    type Response = CallResponse;
    type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<CallRequest>) -> Self::Future {
        Box::pin(handle_call(self.0.clone(), request))
    }
}

/// The `Service<http::Request<BoxBody>>` leaf, shaped like the
/// `*Server<T>` struct `tonic-build` emits for a unary-only service: one
/// path-matched arm per RPC, falling through to `Unimplemented` for
/// anything else.
#[derive(Clone)]
struct DynamicSubclassServiceSvc(Arc<State>);

impl tonic::codegen::Service<http::Request<BoxBody>> for DynamicSubclassServiceSvc {
    type Response = http::Response<BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<BoxBody>) -> Self::Future {
        let state = self.0.clone();
        match req.uri().path() {
            "/dynamic_subclass.DynamicSubclassService/Setup" => {
                let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                Box::pin(async move { Ok(grpc.unary(SetupSvc, req).await) })
            }
            "/dynamic_subclass.DynamicSubclassService/Call" => {
                let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                Box::pin(async move { Ok(grpc.unary(CallSvc(state), req).await) })
            }
            _ => Box::pin(async move {
                Ok(http::Response::builder()
                    .status(200)
                    .header("grpc-status", "12")
                    .header("content-type", "application/grpc")
                    .body(tonic::body::empty_body())
                    .unwrap())
            }),
        }
    }
}

impl tonic::server::NamedService for DynamicSubclassServiceSvc {
    const NAME: &'static str = "dynamic_subclass.DynamicSubclassService";
}

/// A running fake worker: a real TCP listener on an OS-assigned loopback
/// port, serving the `DynamicSubclassService` double plus a standard gRPC
/// health service the timeout-skip probe path talks to.
pub struct FakeWorker {
    pub addr: SocketAddr,
    state: Arc<State>,
    health: tonic_health::server::HealthReporter,
    server: JoinHandle<()>,
}

impl FakeWorker {
    pub async fn spawn(initial_mode: CallMode) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("read local addr");
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

        let state = Arc::new(State { mode: RwLock::new(initial_mode), calls: AtomicUsize::new(0) });
        let service = DynamicSubclassServiceSvc(state.clone());

        let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
        // The health probe queries the empty-string service key (see
        // `fleet_rpc::health::check`), not this service's own proto name.
        health_reporter.set_service_status("", ServingStatus::Serving).await;

        let server = tokio::spawn(async move {
            let _ = tonic::transport::Server::builder()
                .add_service(service)
                .add_service(health_service)
                .serve_with_incoming(incoming)
                .await;
        });

        Self { addr, state, health: health_reporter, server }
    }

    pub fn set_mode(&self, mode: CallMode) {
        *self.state.mode.write() = mode;
    }

    pub async fn set_serving(&self, serving: bool) {
        let status = if serving { ServingStatus::Serving } else { ServingStatus::NotServing };
        let mut reporter = self.health.clone();
        reporter.set_service_status("", status).await;
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakeWorker {
    fn drop(&mut self) {
        self.server.abort();
    }
}
