//! Result-or-status frames for the bidirectional stream.

use crate::details;
use crate::error::Error;
use crate::proto::{StreamingHelloResponse, streaming_hello_response::Response};
use crate::status::Status;

/// A frame on the bidirectional stream: exactly one of a successful result or
/// an embedded status.
///
/// An embedded status does not end the stream by itself; it reports on the
/// request that triggered it.
#[derive(Clone, Debug)]
pub enum StreamingReply {
    Result(String),
    Status(Status),
}

impl StreamingReply {
    pub fn result(text: impl Into<String>) -> Self {
        Self::Result(text.into())
    }

    pub fn as_result(&self) -> Option<&str> {
        match self {
            Self::Result(text) => Some(text),
            Self::Status(_) => None,
        }
    }

    pub fn as_status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            Self::Result(_) => None,
        }
    }
}

impl From<Status> for StreamingReply {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

impl From<StreamingReply> for StreamingHelloResponse {
    fn from(reply: StreamingReply) -> Self {
        let response = match reply {
            StreamingReply::Result(text) => Response::Result(text),
            StreamingReply::Status(status) => Response::Status(status.to_proto()),
        };
        Self {
            response: Some(response),
        }
    }
}

impl TryFrom<StreamingHelloResponse> for StreamingReply {
    type Error = Error;

    fn try_from(frame: StreamingHelloResponse) -> Result<Self, Self::Error> {
        match frame.response {
            Some(Response::Result(text)) => Ok(Self::Result(text)),
            Some(Response::Status(proto)) => Ok(Self::Status(Status::from_proto(
                proto,
                &details::registry(),
            ))),
            None => Err(Error::EmptyFrame),
        }
    }
}
