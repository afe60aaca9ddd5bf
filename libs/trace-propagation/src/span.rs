use std::borrow::Cow;

use opentelemetry::trace::{Span as _, SpanKind, Status, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::Span;

use crate::context::TraceContext;
use crate::provider::TracingContext;

/// Extra per-message attributes merged into the fixed consumer attributes.
pub type AttributeSet = Vec<KeyValue>;

pub const MESSAGING_SYSTEM: &str = "kafka";
pub const NET_TRANSPORT: &str = "IP.TCP";

/// Attributes every consumer span carries.
pub fn consumer_attributes(topic: &str) -> AttributeSet {
    vec![
        KeyValue::new("messaging.destination_kind", "topic"),
        KeyValue::new("span.otel.kind", "CONSUMER"),
        KeyValue::new("messaging.system", MESSAGING_SYSTEM),
        KeyValue::new("net.transport", NET_TRANSPORT),
        KeyValue::new("messaging.destination", topic.to_string()),
        KeyValue::new("messaging.operation", "receive"),
    ]
}

/// Start a consumer span for one message on `topic`.
///
/// With `parent` the span continues the producer's trace; without it the
/// span starts a new trace.
pub fn start_consumer_span(
    tracing: &TracingContext,
    topic: &str,
    parent: Option<&TraceContext>,
    attrs: AttributeSet,
) -> ConsumerSpan {
    let cx = match parent {
        Some(parent) => Context::new().with_remote_span_context(parent.to_span_context()),
        None => Context::new(),
    };

    let mut attributes = consumer_attributes(topic);
    attributes.extend(attrs);

    let tracer = tracing.tracer();
    let span = tracer
        .span_builder(format!("{topic} receive"))
        .with_kind(SpanKind::Consumer)
        .with_attributes(attributes)
        .start_with_context(tracer, &cx);

    ConsumerSpan { inner: Some(span) }
}

// ═══════════════════════════════════════════════════════════════
//  ConsumerSpan — ends on every exit path
// ═══════════════════════════════════════════════════════════════

/// Scope guard around an open span. Ended by [`ConsumerSpan::end`] or,
/// failing that, on drop.
pub struct ConsumerSpan {
    inner: Option<Span>,
}

impl ConsumerSpan {
    pub fn set_error(&mut self, description: impl Into<Cow<'static, str>>) {
        if let Some(span) = self.inner.as_mut() {
            span.set_status(Status::error(description));
        }
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(mut span) = self.inner.take() {
            span.end();
        }
    }
}

impl Drop for ConsumerSpan {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::extract_context;
    use opentelemetry::trace::{SpanId, TraceId};
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

    fn tracing_with_exporter() -> (TracingContext, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (TracingContext::from_provider(provider, "test-consumer"), exporter)
    }

    fn attr<'a>(span: &'a opentelemetry_sdk::trace::SpanData, key: &str) -> Option<&'a KeyValue> {
        span.attributes.iter().find(|kv| kv.key.as_str() == key)
    }

    #[test]
    fn child_of_remote_parent() {
        let (tracing, exporter) = tracing_with_exporter();
        let parent =
            extract_context(Some("00-ad9dd3e072a6770c05b4fa117b3c50b7-dbde5131c90c0207-01")).unwrap();

        start_consumer_span(&tracing, "stargazers-results", Some(&parent), Vec::new()).end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(
            span.span_context.trace_id(),
            TraceId::from_hex("ad9dd3e072a6770c05b4fa117b3c50b7").unwrap()
        );
        assert_eq!(span.parent_span_id, SpanId::from_hex("dbde5131c90c0207").unwrap());
        assert_eq!(span.span_kind, SpanKind::Consumer);
        assert_eq!(span.name, "stargazers-results receive");
    }

    #[test]
    fn root_without_parent() {
        let (tracing, exporter) = tracing_with_exporter();

        start_consumer_span(&tracing, "stargazers-results", None, Vec::new()).end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parent_span_id, SpanId::INVALID);
    }

    #[test]
    fn carries_fixed_and_extra_attributes() {
        let (tracing, exporter) = tracing_with_exporter();
        let extra = vec![KeyValue::new("messaging.url", "localhost:9092")];

        start_consumer_span(&tracing, "stockapp.dollarsbyzip", None, extra).end();

        let spans = exporter.get_finished_spans().unwrap();
        let span = &spans[0];
        for (key, value) in [
            ("messaging.destination_kind", "topic"),
            ("span.otel.kind", "CONSUMER"),
            ("messaging.system", "kafka"),
            ("net.transport", "IP.TCP"),
            ("messaging.destination", "stockapp.dollarsbyzip"),
            ("messaging.operation", "receive"),
            ("messaging.url", "localhost:9092"),
        ] {
            let kv = attr(span, key).unwrap_or_else(|| panic!("missing attribute {key}"));
            assert_eq!(kv.value.as_str(), value);
        }
    }

    #[test]
    fn dropped_guard_still_ends_span() {
        let (tracing, exporter) = tracing_with_exporter();
        {
            let mut span = start_consumer_span(&tracing, "t", None, Vec::new());
            span.set_error("decode failed");
        }
        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error("decode failed"));
    }
}
