pub mod config;
pub mod router;
pub mod service;
pub mod streaming;
pub mod telemetry;
