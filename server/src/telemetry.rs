//! Logging, OpenTelemetry export, and the per-request tracing hooks.
//!
//! Console logging is always on. When `OTEL_EXPORTER_OTLP_ENDPOINT` points at a
//! collector that answers, traces and logs are exported to it as well.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::env;
use std::error::Error;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "snapchef-server";

/// Quick TCP check that the collector behind an OTLP endpoint is up.
fn otlp_reachable(endpoint: &str) -> bool {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://");

    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false)
}

struct OtlpProviders {
    traces: SdkTracerProvider,
    logs: SdkLoggerProvider,
}

fn otlp_providers(
    endpoint: &str,
    service_name: &str,
) -> Result<OtlpProviders, Box<dyn Error + Send + Sync>> {
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(OtlpProviders {
        traces: SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource.clone())
            .build(),
        logs: SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build(),
    })
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let service_name = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.to_string());
    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

    // Exporter setup can only be reported once the subscriber exists.
    let (providers, status) = match endpoint.as_deref() {
        None => (None, "OTEL_EXPORTER_OTLP_ENDPOINT not set".to_string()),
        Some(endpoint) if !otlp_reachable(endpoint) => {
            (None, format!("OpenTelemetry endpoint {} not reachable", endpoint))
        }
        Some(endpoint) => match otlp_providers(endpoint, &service_name) {
            Ok(providers) => (Some(providers), String::new()),
            Err(e) => (None, format!("Failed to create OTLP exporters: {}", e)),
        },
    };

    let trace_layer = providers.as_ref().map(|p| {
        opentelemetry::global::set_tracer_provider(p.traces.clone());
        tracing_opentelemetry::layer().with_tracer(p.traces.tracer(SERVICE_NAME))
    });
    let log_layer = providers
        .as_ref()
        .map(|p| OpenTelemetryTracingBridge::new(&p.logs));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(trace_layer)
        .with(log_layer)
        .init();

    match (providers.is_some(), endpoint) {
        (true, Some(endpoint)) => tracing::info!(
            endpoint = %endpoint,
            service_name = %service_name,
            "OpenTelemetry enabled, exporting traces and logs"
        ),
        _ => tracing::info!("{}, using console logging only", status),
    }
}

/// One span per request, named by the matched route rather than the raw path.
pub fn request_span(request: &Request<Body>) -> Span {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or(request.uri().path());

    tracing::info_span!("http_request", method = %request.method(), path = %path)
}

pub fn record_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status().as_u16();
    let latency_ms = latency.as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(status, latency_ms, "request failed with server error");
    } else {
        tracing::info!(status, latency_ms, "request completed");
    }
}

pub fn record_failure(error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    let latency_ms = latency.as_millis() as u64;
    tracing::error!(error = %error, latency_ms, "request failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolvable_endpoint_is_unreachable() {
        assert!(!otlp_reachable("http://collector.invalid:4317"));
        assert!(!otlp_reachable("not a host"));
    }
}
