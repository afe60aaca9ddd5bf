#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("broker: {0}")]
    Connection(#[from] event_api::BrokerError),

    #[error("{0}")]
    Decode(#[from] event_api::DecodeError),
}
