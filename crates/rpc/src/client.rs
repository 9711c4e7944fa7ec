// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-specified tonic client for `dynamic_subclass.DynamicSubclassService`.
//!
//! Shaped the way `tonic-build` would emit it from the `.proto` pair this
//! mirrors: a thin wrapper around [`tonic::client::Grpc`] with one method
//! per RPC, `ready()`-gated before each call.

use crate::proto::dynamic_subclass::{CallRequest, CallResponse, SetupRequest, SetupResponse};
use tonic::codegen::*;

#[derive(Debug, Clone)]
pub struct DynamicSubclassServiceClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl DynamicSubclassServiceClient<tonic::transport::Channel> {
    pub fn new(channel: tonic::transport::Channel) -> Self {
        Self { inner: tonic::client::Grpc::new(channel) }
    }
}

impl<T> DynamicSubclassServiceClient<T>
where
    T: tonic::client::GrpcService<tonic::body::BoxBody>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    pub fn with_interceptor<F>(
        inner: T,
        interceptor: F,
    ) -> DynamicSubclassServiceClient<InterceptedService<T, F>>
    where
        F: tonic::service::Interceptor,
        T::ResponseBody: Default,
    {
        DynamicSubclassServiceClient::from(tonic::client::Grpc::with_interceptor(inner, interceptor))
    }

    pub async fn setup(
        &mut self,
        request: impl tonic::IntoRequest<SetupRequest>,
    ) -> Result<tonic::Response<SetupResponse>, tonic::Status> {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unknown(format!("service was not ready: {}", e.into()))
        })?;
        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(
            "/dynamic_subclass.DynamicSubclassService/Setup",
        );
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(
            "dynamic_subclass.DynamicSubclassService",
            "Setup",
        ));
        self.inner.unary(req, path, codec).await
    }

    pub async fn call(
        &mut self,
        request: impl tonic::IntoRequest<CallRequest>,
    ) -> Result<tonic::Response<CallResponse>, tonic::Status> {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unknown(format!("service was not ready: {}", e.into()))
        })?;
        let codec = tonic::codec::ProstCodec::default();
        let path =
            http::uri::PathAndQuery::from_static("/dynamic_subclass.DynamicSubclassService/Call");
        let mut req = request.into_request();
        req.extensions_mut().insert(GrpcMethod::new(
            "dynamic_subclass.DynamicSubclassService",
            "Call",
        ));
        self.inner.unary(req, path, codec).await
    }
}

impl<T> From<tonic::client::Grpc<T>> for DynamicSubclassServiceClient<T> {
    fn from(inner: tonic::client::Grpc<T>) -> Self {
        Self { inner }
    }
}
