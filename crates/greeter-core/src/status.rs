//! Rich call status: a generic code and message plus ordered typed details.
//!
//! [`Status`] is what both sides reason about. On the wire it rides inside a
//! [`tonic::Status`]: code and message go in `grpc-status`/`grpc-message`,
//! and the full status (details included) is encoded as a `google.rpc.Status`
//! into the `grpc-status-details-bin` trailer. On a bidirectional stream it
//! can also be embedded in a frame as an [`RpcStatus`].

use crate::details::{self, Detail, DetailRegistry};
use crate::proto::RpcStatus;
use bytes::Bytes;
use core::fmt;
use prost::Message;

pub use tonic::Code;

/// Terminal outcome descriptor.
///
/// Statuses are descriptors, not keys: they are cloneable and printable but
/// deliberately not comparable.
#[derive(Clone, Debug)]
pub struct Status {
    code: Code,
    message: String,
    details: Vec<Detail>,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Appends a detail. Details keep the order they were attached in.
    ///
    /// A success status never carries details, so attaching one to an OK
    /// status is a no-op.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Detail>) -> Self {
        if self.is_ok() {
            tracing::debug!("Dropping detail attached to an OK status");
            return self;
        }
        self.details.push(detail.into());
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn to_proto(&self) -> RpcStatus {
        RpcStatus {
            code: self.code as i32,
            message: self.message.clone(),
            details: self.details.iter().map(Detail::to_any).collect(),
        }
    }

    /// Decodes an embedded `google.rpc.Status`. Details on an OK code are
    /// discarded.
    pub fn from_proto(proto: RpcStatus, registry: &DetailRegistry) -> Self {
        let code = Code::from(proto.code);
        let details = if code == Code::Ok {
            Vec::new()
        } else {
            proto
                .details
                .into_iter()
                .map(|any| registry.decode(any))
                .collect()
        };
        Self {
            code,
            message: proto.message,
            details,
        }
    }

    /// Recovers the rich status from a terminated call.
    ///
    /// Code and message always come from the transport status. Details are
    /// decoded from the details trailer when present; a trailer that is not a
    /// valid `google.rpc.Status` is kept as a single [`Detail::Unknown`].
    pub fn from_tonic(status: &tonic::Status, registry: &DetailRegistry) -> Self {
        let mut out = Self::new(status.code(), status.message());
        let raw = status.details();
        if raw.is_empty() {
            return out;
        }

        match RpcStatus::decode(raw) {
            Ok(proto) => {
                out.details = proto
                    .details
                    .into_iter()
                    .map(|any| registry.decode(any))
                    .collect();
            }
            Err(e) => {
                tracing::debug!("Status details trailer failed to decode: {}", e);
                out.details.push(Detail::Unknown(prost_types::Any {
                    type_url: String::new(),
                    value: raw.to_vec(),
                }));
            }
        }
        out
    }
}

impl From<Status> for tonic::Status {
    fn from(status: Status) -> Self {
        if status.details.is_empty() {
            return tonic::Status::new(status.code, status.message);
        }
        let encoded = Bytes::from(status.to_proto().encode_to_vec());
        tonic::Status::with_details(status.code, status.message, encoded)
    }
}

impl From<tonic::Status> for Status {
    fn from(status: tonic::Status) -> Self {
        Self::from_tonic(&status, &details::registry())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Code [{}], Message [{}]",
            self.code as i32, self.message
        )?;
        if !self.details.is_empty() {
            write!(f, ", {} detail(s)", self.details.len())?;
        }
        Ok(())
    }
}
