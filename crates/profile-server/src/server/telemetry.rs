//! # Telemetry
//!
//! Every event is written through a `tracing_subscriber` registry: an
//! [`EnvFilter`] (from `RUST_LOG`, defaulting to `info`) in front of the
//! human-readable `fmt` layer. OpenTelemetry export is opt-in.
//!
//! ## Feature matrix
//!
//! - `otel-tracing`: Exports spans through a `tracing-opentelemetry` layer.
//! - `otel-metrics`: Records per-call request counts, failures and latency.
//! - `otlp`: OTLP/gRPC exporter. The collector address comes from the standard
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` variable.
//! - `stdout`: Writes exported spans and metrics to stdout.
//!
//! Exporters require at least one of `otel-tracing` or `otel-metrics`; both
//! exporters can be enabled at once.
//!
//! ```bash
//! cargo run --features otel-tracing,otel-metrics,otlp
//! ```
//!
//! ## Span behavior
//!
//! - Each RPC runs inside a span created by `#[tracing::instrument]` on the
//!   resource service, so storage errors logged deeper down carry the
//!   operation and the addressed id.
//! - The HTTP gateway adds a request span per call through
//!   `tower_http::trace::TraceLayer`.
//!
//! ## Request logging
//!
//! [`log_call`] is the equivalent of a unary logging interceptor: one event per
//! finished call with its transport, method, status code and latency. Failures
//! are logged at `warn` (client errors) or `error` (server errors). The same
//! call feeds the request metrics, so both transports report identically.

#[cfg(all(feature = "otlp", not(any(feature = "otel-tracing", feature = "otel-metrics"))))]
compile_error!(
    "The 'otlp' feature requires at least one of 'otel-tracing' or 'otel-metrics' to be enabled."
);

#[cfg(all(
    feature = "stdout",
    not(any(feature = "otel-tracing", feature = "otel-metrics"))
))]
compile_error!(
    "The 'stdout' feature requires at least one of 'otel-tracing' or 'otel-metrics' to be enabled."
);

use core::time::Duration;
use tonic::Code;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(all(feature = "otlp", any(feature = "otel-metrics", feature = "otel-tracing")))]
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};

#[cfg(feature = "otel-metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "otel-metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "otel-metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "otel-tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel-tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "otel-tracing")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "profile-server";

/// Exporter pipelines that must be flushed before the process exits.
pub struct TelemetryProviders {
    #[cfg(feature = "otel-tracing")]
    tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "otel-metrics")]
    meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and stops every exporter. Called once, after the last
    /// transport has drained. Errors go to stderr since the subscriber may
    /// already be unable to deliver them.
    pub fn shutdown(self) {
        #[cfg(feature = "otel-tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "otel-metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

/// Installs the global subscriber. Must be called once, before any listener
/// starts.
pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel-tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "otel-tracing")]
    let tracer_provider = init_tracer()?;

    #[cfg(feature = "otel-metrics")]
    let meter_provider = init_metrics()?;

    #[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        );

    #[cfg(feature = "otel-tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "otel-metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(&meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel-tracing")]
        tracer_provider,
        #[cfg(feature = "otel-metrics")]
        meter_provider,
    })
}

#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "otel-metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let reader = sdkmetrics::PeriodicReader::builder(
            opentelemetry_stdout::MetricExporter::default(),
        )
        .with_interval(Duration::from_secs(5))
        .build();
        builder.with_reader(reader)
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_timeout(Duration::from_secs(10))
            .with_compression(Compression::Gzip)
            .build()
            .context("failed to build metrics exporter")?;
        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(feature = "otel-tracing")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = builder.with_span_processor(batch(opentelemetry_stdout::SpanExporter::default()));

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_timeout(Duration::from_secs(10))
            .with_compression(Compression::Gzip)
            .build()
            .context("failed to build tracer exporter")?;
        builder.with_span_processor(batch(exporter))
    };

    Ok(builder.build())
}

#[cfg(all(feature = "otel-tracing", any(feature = "stdout", feature = "otlp")))]
fn batch<E: opentelemetry_sdk::trace::SpanExporter + 'static>(
    exporter: E,
) -> sdktrace::BatchSpanProcessor {
    sdktrace::BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            sdktrace::BatchConfigBuilder::default()
                .with_scheduled_delay(Duration::from_secs(5))
                .with_max_queue_size(2048)
                .build(),
        )
        .build()
}

#[cfg(feature = "otel-metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static FAILURES: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static LATENCY_MS: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "otel-metrics")]
fn init_metric_handles(meter: &Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Finished calls, by transport, method and code")
            .build(),
    );

    let _ = FAILURES.set(
        meter
            .u64_counter("errors")
            .with_description("Calls that finished with a non-OK code")
            .build(),
    );

    let _ = LATENCY_MS.set(
        meter
            .f64_histogram("call_duration")
            .with_unit("ms")
            .with_description("End-to-end call latency")
            .build(),
    );
}

#[cfg(feature = "otel-metrics")]
fn record_call(transport: &'static str, method: &'static str, code: Code, latency_ms: f64) {
    let attributes = [
        KeyValue::new("transport", transport),
        KeyValue::new("method", method),
        KeyValue::new("code", format!("{code:?}")),
    ];
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &attributes);
    }
    if code != Code::Ok {
        if let Some(counter) = FAILURES.get() {
            counter.add(1, &attributes);
        }
    }
    if let Some(histogram) = LATENCY_MS.get() {
        histogram.record(latency_ms, &attributes[..2]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
fn record_call(_transport: &'static str, _method: &'static str, _code: Code, _latency_ms: f64) {}

/// Records the outcome of a single call.
pub fn log_call(transport: &'static str, method: &'static str, code: Code, elapsed: Duration) {
    let latency_ms = elapsed.as_secs_f64() * 1_000.0;
    record_call(transport, method, code, latency_ms);
    match code {
        Code::Ok => {
            tracing::info!(transport, method, code = ?code, latency_ms, "call finished");
        }
        Code::Internal | Code::Unknown | Code::DataLoss | Code::Unavailable => {
            tracing::error!(transport, method, code = ?code, latency_ms, "call failed");
        }
        _ => {
            tracing::warn!(transport, method, code = ?code, latency_ms, "call rejected");
        }
    }
}
