/// Broker-level failure. Fatal to the consumer loop that observes it.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("create consumer: {0}")]
    Create(String),

    #[error("subscribe '{topic}': {detail}")]
    Subscribe { topic: String, detail: String },

    #[error("receive: {0}")]
    Receive(String),

    #[error("consumer already closed")]
    Closed,
}

/// Message body does not match the record schema of this deployment.
#[derive(Debug, thiserror::Error)]
#[error("decode {kind} record: {source}")]
pub struct DecodeError {
    pub kind: crate::RecordKind,
    #[source]
    pub source: serde_json::Error,
}
