#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("tracing export: {0}")]
    Export(#[from] trace_propagation::ExportError),

    #[error("broker: {0}")]
    Broker(#[from] event_api::BrokerError),

    #[error("query api: {0}")]
    Api(#[from] query_api_server::ApiServerError),

    #[error("task: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
