//! gRPC service implementation for the `greeter.Greeter` service.
//!
//! This module defines [`GreeterService`], the concrete implementation of the
//! generated [`Greeter`] trait. Each call shape is handled here as transport
//! plumbing only; what to answer is decided by a [`ResponsePolicy`].
//!
//! ## Responsibilities
//!
//! - Map policy outcomes onto gRPC responses and rich statuses.
//! - Spawn one task per streaming call, connected to tonic through a bounded
//!   channel.
//! - Cancel in-flight streams on graceful shutdown.

use crate::server::{
    config::ServerConfig,
    router::{GreeterPolicy, ResponsePolicy},
    streaming::{
        bidi::{ServerDuplex, serve_bidi},
        feeder::feed_results,
    },
    telemetry::{
        decrement_streams_inflight, increment_requests, increment_stream_errors,
        increment_streams_inflight,
    },
};
use core::pin::Pin;
use greeter_core::proto::{
    HelloRequest, HelloResponse, StreamingHelloResponse, greeter_server::Greeter,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};

type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// The greeter service.
///
/// Cheap to clone: the policy and the shutdown token are shared.
pub struct GreeterService<P = GreeterPolicy> {
    config: ServerConfig,
    policy: Arc<P>,
    shutdown: CancellationToken,
}

impl<P> Clone for GreeterService<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            policy: Arc::clone(&self.policy),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl GreeterService {
    pub fn new(config: ServerConfig) -> Self {
        let policy = GreeterPolicy::new(&config);
        Self::with_policy(config, policy)
    }
}

impl<P: ResponsePolicy> GreeterService<P> {
    pub fn with_policy(config: ServerConfig, policy: P) -> Self {
        Self {
            config,
            policy: Arc::new(policy),
            shutdown: CancellationToken::new(),
        }
    }

    /// Ends every open stream with `UNAVAILABLE`. Unary and client-streaming
    /// calls in flight complete normally.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn ensure_running(&self) -> Result<(), Status> {
        if self.shutdown.is_cancelled() {
            increment_stream_errors();
            return Err(greeter_core::Error::ServiceShutdown.into());
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl<P: ResponsePolicy> Greeter for GreeterService<P> {
    type SayHelloSSStream = ResponseStream<HelloResponse>;
    type SayHelloBIStream = ResponseStream<StreamingHelloResponse>;

    #[tracing::instrument(skip_all, fields(name = %req.get_ref().name))]
    async fn say_hello_un(
        &self,
        req: Request<HelloRequest>,
    ) -> Result<Response<HelloResponse>, Status> {
        let req = req.into_inner();
        tracing::info!("SayHelloUN: Received: {:?}", req);
        increment_requests("SayHelloUN");

        match self.policy.unary(&req) {
            Ok(result) => Ok(Response::new(HelloResponse { result })),
            Err(status) => {
                increment_stream_errors();
                Err(status.into())
            }
        }
    }

    #[tracing::instrument(skip_all, fields(name = %req.get_ref().name))]
    async fn say_hello_ss(
        &self,
        req: Request<HelloRequest>,
    ) -> Result<Response<Self::SayHelloSSStream>, Status> {
        let req = req.into_inner();
        tracing::info!("SayHelloSS: Start with a request: {:?}", req);
        increment_requests("SayHelloSS");
        self.ensure_running()?;

        let plan = self.policy.server_stream(&req);
        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);

        increment_streams_inflight();
        let interval = self.config.stream_interval;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            feed_results(plan, resp_tx, interval, shutdown).await;
            decrement_streams_inflight();
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }

    async fn say_hello_cs(
        &self,
        req: Request<Streaming<HelloRequest>>,
    ) -> Result<Response<HelloResponse>, Status> {
        tracing::info!("SayHelloCS: Start");
        increment_requests("SayHelloCS");

        let mut inbound = req.into_inner();
        let mut names = Vec::new();
        loop {
            match inbound.message().await {
                Ok(Some(req)) => {
                    tracing::info!("SayHelloCS: Received: {:?}", req);
                    names.push(req.name);
                }
                Ok(None) => break,
                Err(status) => {
                    tracing::warn!("SayHelloCS: Recv() error : {}", status);
                    increment_stream_errors();
                    return Err(status);
                }
            }
        }

        match self.policy.client_stream(&names) {
            Ok(result) => Ok(Response::new(HelloResponse { result })),
            Err(status) => {
                increment_stream_errors();
                Err(status.into())
            }
        }
    }

    async fn say_hello_bi(
        &self,
        req: Request<Streaming<HelloRequest>>,
    ) -> Result<Response<Self::SayHelloBIStream>, Status> {
        tracing::info!("SayHelloBI: Start");
        increment_requests("SayHelloBI");
        self.ensure_running()?;

        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let channel: ServerDuplex = greeter_core::DuplexChannel::new(resp_tx, req.into_inner());

        increment_streams_inflight();
        let policy = Arc::clone(&self.policy);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            serve_bidi(channel, policy, shutdown).await;
            decrement_streams_inflight();
            tracing::info!("SayHelloBI: End");
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}
