use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use event_api::RecordKind;
use event_consumer::DecodeErrorPolicy;
use trace_propagation::{DEFAULT_OTLP_ENDPOINT, TelemetryConfig};

use crate::error::ServerError;

/// Endpoint value that turns span export off.
pub const EXPORT_DISABLED: &str = "disabled";

#[derive(Parser)]
#[command(name = "event-server", about = "Kafka event consumer with a JSON snapshot endpoint")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Consume the topic and serve everything received so far on `GET /`
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Optional TOML config file
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<String>,

    /// Kafka bootstrap servers
    #[arg(long, env = "BOOTSTRAP_SERVERS")]
    pub bootstrap_servers: Option<String>,

    /// Topic to consume (defaults to the record kind's topic)
    #[arg(long, env = "TOPIC")]
    pub topic: Option<String>,

    /// Record schema: `stargazer` or `dollars-by-zip`
    #[arg(long, env = "RECORD_KIND")]
    pub record: Option<RecordKind>,

    /// OTLP gRPC collector endpoint, or `disabled`
    #[arg(long, env = "OTEL_ENDPOINT")]
    pub otel_endpoint: Option<String>,

    /// HTTP port of the query endpoint
    #[arg(long, env = "API_PORT")]
    pub api_port: Option<u16>,

    /// `stop` or `skip` on an undecodable message
    #[arg(long, env = "ON_DECODE_ERROR")]
    pub on_decode_error: Option<DecodeErrorPolicy>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_port: u16,
    pub bootstrap_servers: String,
    /// Falls back to [`RecordKind::default_topic`].
    pub topic: Option<String>,
    pub record: RecordKind,
    pub on_decode_error: DecodeErrorPolicy,
    /// librdkafka debug contexts, e.g. "consumer".
    pub kafka_debug: Option<String>,
    /// Extra librdkafka properties, e.g. `"session.timeout.ms" = "6000"`.
    pub kafka: BTreeMap<String, String>,
    pub telemetry: TelemetrySection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    pub endpoint: String,
    pub service_name: String,
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: 3100,
            bootstrap_servers: "localhost:9092".to_string(),
            topic: None,
            record: RecordKind::default(),
            on_decode_error: DecodeErrorPolicy::default(),
            kafka_debug: None,
            kafka: BTreeMap::new(),
            telemetry: TelemetrySection::default(),
        }
    }
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: "event-consumer".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Load `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ServerError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            context: "read",
            detail: format!("'{path}': {e}"),
        })?;
        Self::parse(&content).map_err(|detail| ServerError::Config {
            context: "parse",
            detail: format!("'{path}': {detail}"),
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Command line and environment win over the file.
    pub fn apply(&mut self, args: &ServeArgs) {
        if let Some(v) = &args.bootstrap_servers {
            self.bootstrap_servers = v.clone();
        }
        if let Some(v) = &args.topic {
            self.topic = Some(v.clone());
        }
        if let Some(v) = args.record {
            self.record = v;
        }
        if let Some(v) = &args.otel_endpoint {
            self.telemetry.endpoint = v.clone();
        }
        if let Some(v) = args.api_port {
            self.api_port = v;
        }
        if let Some(v) = args.on_decode_error {
            self.on_decode_error = v;
        }
    }

    pub fn topic(&self) -> &str {
        self.topic
            .as_deref()
            .unwrap_or_else(|| self.record.default_topic())
    }

    /// `None` when span export is disabled.
    pub fn telemetry_config(&self) -> Option<TelemetryConfig> {
        let endpoint = self.telemetry.endpoint.trim();
        if endpoint.is_empty() || endpoint == EXPORT_DISABLED {
            return None;
        }
        Some(TelemetryConfig {
            endpoint: endpoint.to_string(),
            service_name: self.telemetry.service_name.clone(),
            connect_timeout: Duration::from_millis(self.telemetry.connect_timeout_ms),
        })
    }
}
