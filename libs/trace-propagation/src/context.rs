use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};

use crate::error::TraceParseError;

/// Remote parent decoded from a `traceparent` header:
/// `version-traceid-spanid-flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: [u8; 16],
    pub span_id: [u8; 8],
    pub flags: u8,
}

impl TraceContext {
    pub fn is_sampled(&self) -> bool {
        self.flags & TraceFlags::SAMPLED.to_u8() != 0
    }

    /// Header value in canonical lowercase form, version `00`.
    pub fn to_traceparent(&self) -> String {
        format!(
            "00-{}-{}-{:02x}",
            hex::encode(self.trace_id),
            hex::encode(self.span_id),
            self.flags
        )
    }

    /// OpenTelemetry span context marked as remote, usable as a parent.
    pub fn to_span_context(&self) -> SpanContext {
        SpanContext::new(
            TraceId::from_bytes(self.trace_id),
            SpanId::from_bytes(self.span_id),
            TraceFlags::new(self.flags),
            true,
            TraceState::default(),
        )
    }
}

/// Parse the raw `traceparent` header value.
///
/// Only the trace id and span id tokens are required. Both must be
/// lowercase hex of the exact width and not all zeros. The flags token is
/// optional and a malformed one falls back to "not sampled"; the version
/// token is not interpreted.
pub fn extract_context(header: Option<&str>) -> Result<TraceContext, TraceParseError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(TraceParseError::Missing);
    };

    let mut tokens = header.split('-');
    let _version = tokens.next();
    let trace_hex = tokens
        .next()
        .filter(|t| !t.is_empty())
        .ok_or(TraceParseError::MissingToken("trace id"))?;
    let span_hex = tokens
        .next()
        .filter(|t| !t.is_empty())
        .ok_or(TraceParseError::MissingToken("span id"))?;

    let trace_id = decode_id::<16>(trace_hex)
        .ok_or_else(|| TraceParseError::InvalidTraceId(trace_hex.to_string()))?;
    let span_id = decode_id::<8>(span_hex)
        .ok_or_else(|| TraceParseError::InvalidSpanId(span_hex.to_string()))?;

    let flags = tokens
        .next()
        .filter(|t| t.len() == 2)
        .and_then(|t| u8::from_str_radix(t, 16).ok())
        .unwrap_or_default();

    Ok(TraceContext {
        trace_id,
        span_id,
        flags,
    })
}

/// `N` bytes from exactly `2 * N` lowercase hex chars. All-zero ids are invalid.
fn decode_id<const N: usize>(token: &str) -> Option<[u8; N]> {
    if !token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    let mut id = [0u8; N];
    hex::decode_to_slice(token, &mut id).ok()?;
    id.iter().any(|b| *b != 0).then_some(id)
}
