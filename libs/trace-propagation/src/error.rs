/// Malformed or absent `traceparent` header. Never fatal to message
/// processing; the message is handled without a consumer span.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceParseError {
    #[error("traceparent header is absent")]
    Missing,

    #[error("traceparent has no {0} token")]
    MissingToken(&'static str),

    #[error("invalid trace id '{0}': expected 32 hex chars")]
    InvalidTraceId(String),

    #[error("invalid span id '{0}': expected 16 hex chars")]
    InvalidSpanId(String),
}

/// Tracing backend cannot be set up. Fatal to process startup.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("collector endpoint '{endpoint}': {detail}")]
    Endpoint { endpoint: String, detail: String },

    #[error("collector {addr} unreachable: {detail}")]
    Unreachable { addr: String, detail: String },

    #[error("build span exporter: {0}")]
    Build(String),
}
