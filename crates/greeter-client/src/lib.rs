//! # `greeter-client`: calls against the greeter gRPC service
//!
//! Library half of the `greeter-client` binary, also used by the server's
//! end-to-end tests.
//!
//! ## Module Overview
//!
//! - [`calls`] - one helper per call shape (unary, server streaming, client
//!   streaming, opening a bidirectional call).
//! - [`coordinator`] - drives a bidirectional call with independent send and
//!   receive loops joined at completion.
//! - [`generator`] - request sources: time-paced, numbered, sentinel
//!   substitution, or a fixed script.
//! - [`classify`] - turns failed calls into code, message and per-detail
//!   lines.
//! - [`config`] - command-line and environment configuration.
//! - [`logging`] - console log setup.

pub mod calls;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod generator;
pub mod logging;
