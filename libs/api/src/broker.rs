use std::future::Future;
use std::pin::Pin;

use crate::error::BrokerError;

/// Metadata key carrying the W3C trace context of the producer.
pub const TRACEPARENT_HEADER: &str = "traceparent";

// ════════════════════════════════════════════════════════════════
//  Inbound message
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub key: String,
    pub value: Vec<u8>,
}

/// Owned copy of one consumed broker message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<MessageHeader>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(MessageHeader {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the first header named `key`.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.value.as_slice())
    }
}

/// One event yielded by the broker event source.
#[derive(Debug)]
pub enum BrokerEvent {
    Message(InboundMessage),
    Error(BrokerError),
}

// ════════════════════════════════════════════════════════════════
//  BrokerConsumer — boundary to the message broker client
// ════════════════════════════════════════════════════════════════

/// Minimal consumer surface the consumer loop depends on.
///
/// Implementations own the connection; the loop owns the implementation
/// and calls [`close`](BrokerConsumer::close) exactly once on termination.
pub trait BrokerConsumer: Send {
    fn subscribe(&mut self, topic: &str) -> Result<(), BrokerError>;

    /// Wait for the next message or error. Must be cancel-safe: dropping the
    /// future before it resolves loses no message.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = BrokerEvent> + Send + '_>>;

    fn close(&mut self);
}

impl<B: BrokerConsumer + ?Sized> BrokerConsumer for Box<B> {
    fn subscribe(&mut self, topic: &str) -> Result<(), BrokerError> {
        (**self).subscribe(topic)
    }

    fn recv(&mut self) -> Pin<Box<dyn Future<Output = BrokerEvent> + Send + '_>> {
        (**self).recv()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
