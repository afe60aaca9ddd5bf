use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};

use crate::error::ExportError;

pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP gRPC collector endpoint.
    pub endpoint: String,
    /// Reported as `service.name` and used as the tracer scope.
    pub service_name: String,
    /// Upper bound for the startup reachability probe.
    pub connect_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: "event-consumer".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  TracingContext
// ═══════════════════════════════════════════════════════════════

/// Tracer provider built once at startup and handed to whoever starts
/// spans. Nothing is installed globally.
pub struct TracingContext {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
}

impl TracingContext {
    /// Connect to the OTLP collector and build a batching provider.
    ///
    /// Fails if the collector cannot be reached within `connect_timeout`.
    pub async fn init(config: &TelemetryConfig) -> Result<Self, ExportError> {
        let addr = collector_addr(&config.endpoint)?;
        probe(&addr, config.connect_timeout).await?;

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.clone())
            .with_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ExportError::Build(e.to_string()))?;

        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(
                Resource::builder()
                    .with_service_name(config.service_name.clone())
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();

        tracing::info!(endpoint = %config.endpoint, service = %config.service_name, "span export ready");
        Ok(Self::from_provider(provider, config.service_name.clone()))
    }

    /// Wrap an already configured provider.
    pub fn from_provider(provider: SdkTracerProvider, scope: impl Into<String>) -> Self {
        let tracer = provider.tracer(scope.into());
        Self { provider, tracer }
    }

    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    /// Flush pending spans and stop the exporter.
    pub fn shutdown(&self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "tracer provider shutdown");
        }
    }
}

/// `host:port` of the collector. Port defaults to the OTLP gRPC port.
fn collector_addr(endpoint: &str) -> Result<String, ExportError> {
    let uri: http::Uri = endpoint.parse().map_err(|e: http::uri::InvalidUri| ExportError::Endpoint {
        endpoint: endpoint.to_string(),
        detail: e.to_string(),
    })?;
    let host = uri.host().ok_or_else(|| ExportError::Endpoint {
        endpoint: endpoint.to_string(),
        detail: "no host".to_string(),
    })?;
    Ok(format!("{host}:{}", uri.port_u16().unwrap_or(4317)))
}

async fn probe(addr: &str, timeout: Duration) -> Result<(), ExportError> {
    let unreachable = |detail: String| ExportError::Unreachable {
        addr: addr.to_string(),
        detail,
    };
    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(unreachable(e.to_string())),
        Err(_) => Err(unreachable(format!("no answer within {timeout:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_addr_defaults_port() {
        assert_eq!(collector_addr("http://otel:4317").unwrap(), "otel:4317");
        assert_eq!(collector_addr("http://collector").unwrap(), "collector:4317");
        assert_eq!(collector_addr("localhost:8200").unwrap(), "localhost:8200");
    }

    #[test]
    fn collector_addr_rejects_garbage() {
        assert!(matches!(
            collector_addr("http://"),
            Err(ExportError::Endpoint { .. })
        ));
    }

    #[tokio::test]
    async fn init_fails_when_collector_is_down() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = TelemetryConfig {
            endpoint: format!("http://127.0.0.1:{port}"),
            connect_timeout: Duration::from_millis(500),
            ..TelemetryConfig::default()
        };
        let err = TracingContext::init(&config).await.err().unwrap();
        assert!(matches!(err, ExportError::Unreachable { .. }), "{err}");
    }
}
