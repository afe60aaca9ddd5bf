mod http;

use axum::Router;
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use event_api::Record;
use event_store::StoreReader;

#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    #[error("bind api :{port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("axum serve: {0}")]
    Serve(std::io::Error),
}

#[derive(Clone)]
struct AppState {
    reader: StoreReader<Record>,
}

/// Read-only query routes over the event store.
pub fn router(reader: StoreReader<Record>) -> Router {
    Router::new()
        .route("/", get(http::handle_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { reader })
}

/// Serve [`router`] on `0.0.0.0:port` until `shutdown` is cancelled.
pub async fn run(
    port: u16,
    reader: StoreReader<Record>,
    shutdown: CancellationToken,
) -> Result<(), ApiServerError> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| ApiServerError::Bind { port, source })?;
    tracing::info!(port, "query api listening");

    axum::serve(listener, router(reader))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ApiServerError::Serve)
}
