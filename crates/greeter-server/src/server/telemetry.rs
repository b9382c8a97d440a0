//! # Telemetry
//!
//! Console logging is always on. The optional `otel` feature additionally
//! exports OpenTelemetry traces and metrics to stdout.
//!
//! ## Log output
//!
//! - Filtering from `RUST_LOG`, defaulting to `info`.
//! - Pretty-printed events with thread id, file and line.
//! - Timestamped using local time (RFC 3339 format).
//!
//! ## Span behavior (`otel`)
//!
//! - Spans created via `tracing::info_span!` or `#[instrument]` are exported.
//! - Events inside a span become span events; events outside a span only
//!   reach the console.
//!
//! ## Metrics (`otel`)
//!
//! - `requests`: calls received, by `method`.
//! - `streams_inflight`: open streaming calls.
//! - `stream_errors`: calls or streams that ended in an error.
//! - `stream_frames`: messages sent on streaming calls.
//!
//! The helpers at the bottom of this module compile to no-ops without the
//! feature.
//!
//! ```bash
//! cargo run --bin greeter-server --features otel
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "otel")]
use opentelemetry::metrics::{Counter, Meter, UpDownCounter};
#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(feature = "otel")]
use opentelemetry_sdk::Resource;
#[cfg(feature = "otel")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "otel")]
use opentelemetry_sdk::trace as sdktrace;
#[cfg(feature = "otel")]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "otel")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "otel")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel")]
    let tracer_provider = init_tracer();
    #[cfg(feature = "otel")]
    let meter_provider = init_metrics();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "otel")]
    let registry = {
        let scope = InstrumentationScope::builder("greeter")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();

        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        init_metric_handles(opentelemetry::global::meter_with_scope(scope.clone()));

        registry
            .with(
                tracing_opentelemetry::layer()
                    .with_tracer(tracer_provider.tracer_with_scope(scope))
                    .with_error_records_to_exceptions(true),
            )
            .with(tracing_opentelemetry::MetricsLayer::new(
                meter_provider.clone(),
            ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer_provider,
        #[cfg(feature = "otel")]
        meter_provider,
    })
}

/// Flushes and shuts down exporters. A no-op without `otel`.
pub fn shutdown_telemetry(_providers: TelemetryProviders) {
    #[cfg(feature = "otel")]
    {
        if let Err(err) = _providers.tracer_provider.force_flush() {
            eprintln!("Error flushing traces: {:#?}", err);
        }
        if let Err(err) = _providers.tracer_provider.shutdown() {
            eprintln!("Error shutting down tracer: {:#?}", err);
        }
        if let Err(err) = _providers.meter_provider.force_flush() {
            eprintln!("Error flushing metrics: {:#?}", err);
        }
        if let Err(err) = _providers.meter_provider.shutdown() {
            eprintln!("Error shutting down meter: {:#?}", err);
        }
    }
}

#[cfg(feature = "otel")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("greeter")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "otel")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let batch = sdktrace::BatchSpanProcessor::builder(opentelemetry_stdout::SpanExporter::default())
        .with_batch_config(
            sdktrace::BatchConfigBuilder::default()
                .with_scheduled_delay(std::time::Duration::from_secs(5))
                .with_max_queue_size(2048)
                .build(),
        )
        .build();

    sdktrace::SdkTracerProvider::builder()
        .with_resource(resource())
        .with_span_processor(batch)
        .build()
}

#[cfg(feature = "otel")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let reader =
        sdkmetrics::PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
            .with_interval(std::time::Duration::from_secs(5))
            .build();

    sdkmetrics::SdkMeterProvider::builder()
        .with_resource(resource())
        .with_reader(reader)
        .build()
}

#[cfg(feature = "otel")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel")]
static STREAMS_INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "otel")]
static STREAM_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel")]
static STREAM_FRAMES: OnceLock<Counter<u64>> = OnceLock::new();

#[cfg(feature = "otel")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total gRPC calls by method")
            .build(),
    );

    let _ = STREAMS_INFLIGHT.set(
        meter
            .i64_up_down_counter("streams_inflight")
            .with_description("Concurrent streaming calls")
            .build(),
    );

    let _ = STREAM_ERRORS.set(
        meter
            .u64_counter("stream_errors")
            .with_description("Calls or streams ended by an error")
            .build(),
    );

    let _ = STREAM_FRAMES.set(
        meter
            .u64_counter("stream_frames")
            .with_description("Messages sent on streaming calls")
            .build(),
    );
}

#[cfg(feature = "otel")]
pub fn increment_requests(method: &'static str) {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[KeyValue::new("method", method)]);
    }
}

#[cfg(not(feature = "otel"))]
pub fn increment_requests(_method: &'static str) {}

#[cfg(feature = "otel")]
pub fn increment_streams_inflight() {
    if let Some(counter) = STREAMS_INFLIGHT.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel"))]
pub fn increment_streams_inflight() {}

#[cfg(feature = "otel")]
pub fn decrement_streams_inflight() {
    if let Some(counter) = STREAMS_INFLIGHT.get() {
        counter.add(-1, &[]);
    }
}

#[cfg(not(feature = "otel"))]
pub fn decrement_streams_inflight() {}

#[cfg(feature = "otel")]
pub fn increment_stream_errors() {
    if let Some(counter) = STREAM_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel"))]
pub fn increment_stream_errors() {}

#[cfg(feature = "otel")]
pub fn increment_stream_frames() {
    if let Some(counter) = STREAM_FRAMES.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel"))]
pub fn increment_stream_frames() {}
