//! W3C trace-context extraction and consumer span creation.
//!
//! Messages carry the producer's position in a distributed trace in a
//! `traceparent` header. [`extract_context`] decodes it, and
//! [`start_consumer_span`] opens a consumer span that continues that
//! trace. A malformed header is reported as [`TraceParseError`] and is
//! meant to be logged and ignored by callers.

pub mod context;
pub mod error;
pub mod provider;
pub mod span;

pub use context::{TraceContext, extract_context};
pub use error::{ExportError, TraceParseError};
pub use provider::{DEFAULT_OTLP_ENDPOINT, TelemetryConfig, TracingContext};
pub use span::{AttributeSet, ConsumerSpan, consumer_attributes, start_consumer_span};

pub use opentelemetry::KeyValue;
