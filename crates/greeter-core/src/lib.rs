//! # `greeter-core`: shared protocol pieces for the greeter gRPC service
//!
//! This crate holds everything the client and server must agree on:
//!
//! - [`proto`] - hand-declared prost messages and the generated `Greeter`
//!   client/server stubs.
//! - [`status`] - the rich status model (code, message, ordered typed
//!   details) and its mapping onto [`tonic::Status`].
//! - [`details`] - typed error details and the registry that decodes them by
//!   type URL.
//! - [`reply`] - [`StreamingReply`], the result-or-status frame sent on the
//!   bidirectional stream.
//! - [`duplex`] - the duplex stream channel shared by the send and receive
//!   halves of a streaming call.
//! - [`error`] - the crate-wide [`Error`] type.

pub mod details;
pub mod duplex;
pub mod error;
pub mod proto;
pub mod reply;
pub mod status;

pub use details::{Detail, DetailKind, DetailRegistry, DynDetail};
pub use duplex::{Duplex, DuplexChannel};
pub use error::{Error, Result};
pub use reply::StreamingReply;
pub use status::{Code, Status};
