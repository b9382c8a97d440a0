//! Response decisions for each call shape.
//!
//! The service handler owns transport concerns (channels, pacing, shutdown)
//! and asks a [`ResponsePolicy`] what to answer. [`GreeterPolicy`] is the
//! default: a small set of trigger names mapped to specific outcomes, which
//! lets a client provoke every error path on demand.

use crate::server::config::ServerConfig;
use greeter_core::proto::{BadRequest, CustomError, HelloRequest};
use greeter_core::{Code, Status, StreamingReply};

pub const ERROR_NAME: &str = "error";
pub const ERROR_DETAILS_NAME: &str = "error-details";
pub const ERROR_CUSTOM_NAME: &str = "error-custom";

/// What a server-streaming call delivers: results in order, then a terminal
/// status. A non-OK terminal status does not retract the results sent before
/// it.
#[derive(Debug, Clone)]
pub struct ServerStreamPlan {
    pub results: Vec<String>,
    pub terminal: Status,
}

pub trait ResponsePolicy: Send + Sync + 'static {
    /// Single request, single outcome.
    fn unary(&self, req: &HelloRequest) -> Result<String, Status>;

    fn server_stream(&self, req: &HelloRequest) -> ServerStreamPlan;

    /// Called once the client has half-closed, with every name it sent.
    fn client_stream(&self, names: &[String]) -> Result<String, Status>;

    /// Frames to emit for one inbound request on a bidirectional stream.
    /// Empty means no reply; the stream stays open either way.
    fn bidi(&self, req: &HelloRequest) -> Vec<StreamingReply>;
}

#[derive(Debug, Clone)]
pub struct GreeterPolicy {
    sentinel: String,
    stream_count: usize,
    disconnect_after_stream: bool,
}

impl GreeterPolicy {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            sentinel: config.sentinel_name.clone(),
            stream_count: config.stream_count,
            disconnect_after_stream: config.disconnect_after_stream,
        }
    }

    fn blank_name() -> Status {
        Status::invalid_argument("Name is blank")
    }
}

impl ResponsePolicy for GreeterPolicy {
    fn unary(&self, req: &HelloRequest) -> Result<String, Status> {
        match req.name.as_str() {
            "" => Err(Self::blank_name()),
            ERROR_NAME => Err(Status::invalid_argument("GRPC error")),
            ERROR_DETAILS_NAME => Err(Status::invalid_argument("GRPC error with details")
                .with_detail(BadRequest::single("Name", "bad request"))),
            ERROR_CUSTOM_NAME => Err(
                Status::invalid_argument("GRPC error with custom error").with_detail(CustomError {
                    error_no: -1,
                    description: "custom error".to_string(),
                }),
            ),
            name => Ok(format!("Hello, {name}")),
        }
    }

    fn server_stream(&self, req: &HelloRequest) -> ServerStreamPlan {
        let results = (0..self.stream_count)
            .map(|i| format!("Hello, {} ({})", req.name, i))
            .collect();

        let terminal = if self.disconnect_after_stream {
            Status::invalid_argument("Disconnect Server Streaming")
        } else {
            Status::ok()
        };

        ServerStreamPlan { results, terminal }
    }

    fn client_stream(&self, names: &[String]) -> Result<String, Status> {
        if names.is_empty() {
            return Err(Status::new(Code::InvalidArgument, "No requests received"));
        }
        Ok(format!("Hello, {}", names.join(", ")))
    }

    fn bidi(&self, req: &HelloRequest) -> Vec<StreamingReply> {
        if req.name.is_empty() {
            vec![StreamingReply::from(Self::blank_name())]
        } else if req.name == self.sentinel {
            vec![StreamingReply::result(format!("I like {}.", self.sentinel))]
        } else {
            Vec::new()
        }
    }
}
