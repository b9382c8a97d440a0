//! Error types for the greeter service.
//!
//! This module defines the central `Error` enum shared by the client and
//! server. It converts into both the rich [`Status`] model and
//! [`tonic::Status`] so failures can be surfaced to a peer with an
//! appropriate code.
//!
//! ## Error Cases
//! - `Rpc`: A call (or one direction of it) terminated with a status.
//! - `SendClosed`: The local send side is already finished, or the peer has
//!   stopped accepting messages.
//! - `EmptyFrame`: A bidirectional frame carried neither a result nor a
//!   status.
//! - `ChannelError`: An internal communication failure between tasks.
//! - `ServiceShutdown`: The service is shutting down.

use crate::status::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the greeter service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The call terminated with a non-success status.
    #[error("Call failed: {0}")]
    Rpc(Status),

    /// The send side is closed; further sends are rejected.
    #[error("Send side is closed")]
    SendClosed,

    /// A streaming frame arrived with no variant set.
    #[error("Streaming response carries neither a result nor a status")]
    EmptyFrame,

    /// Internal channel or task failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    /// The rich status behind an [`Error::Rpc`], if any.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Rpc(status) => Some(status),
            _ => None,
        }
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc(status.into())
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Rpc(status)
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Rpc(status) => status,
            Error::SendClosed => Status::new(Code::Unavailable, "Stream is closed"),
            Error::EmptyFrame => Status::new(Code::Internal, "Empty streaming response"),
            Error::ChannelError { context } => {
                Status::new(Code::Internal, format!("Channel error: {context}"))
            }
            Error::ServiceShutdown => Status::new(Code::Unavailable, "Service is shutting down"),
        }
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        Status::from(err).into()
    }
}
