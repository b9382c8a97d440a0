//! Wire messages for the `greeter.Greeter` service and the generated stubs.
//!
//! The `google.rpc` messages ([`RpcStatus`], [`BadRequest`]) mirror the
//! standard rich error model field-for-field so that status details produced
//! here decode in any gRPC runtime that understands it.

#![allow(clippy::derive_partial_eq_without_eq)]

/// A single greeting request. Carries no identity beyond its position in the
/// stream.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// One successful unit of output.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

/// Frame sent on the bidirectional stream.
///
/// On the wire this is a `oneof`, so `response` may be unset. Convert into
/// [`StreamingReply`](crate::StreamingReply) before acting on it; an unset
/// frame is rejected there.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StreamingHelloResponse {
    #[prost(oneof = "streaming_hello_response::Response", tags = "1, 2")]
    pub response: Option<streaming_hello_response::Response>,
}

pub mod streaming_hello_response {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Response {
        #[prost(string, tag = "1")]
        Result(String),
        #[prost(message, tag = "2")]
        Status(super::RpcStatus),
    }
}

/// Application-defined numbered error, attached to a status as a detail.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CustomError {
    #[prost(int32, tag = "1")]
    pub error_no: i32,
    #[prost(string, tag = "2")]
    pub description: String,
}

/// `google.rpc.Status`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<prost_types::Any>,
}

/// `google.rpc.BadRequest`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BadRequest {
    #[prost(message, repeated, tag = "1")]
    pub field_violations: Vec<bad_request::FieldViolation>,
}

pub mod bad_request {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct FieldViolation {
        #[prost(string, tag = "1")]
        pub field: String,
        #[prost(string, tag = "2")]
        pub description: String,
    }
}

impl BadRequest {
    /// Shorthand for a request with a single offending field.
    pub fn single(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field_violations: vec![bad_request::FieldViolation {
                field: field.into(),
                description: description.into(),
            }],
        }
    }
}

include!(concat!(env!("OUT_DIR"), "/greeter.Greeter.rs"));
