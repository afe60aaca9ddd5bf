use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use event_api::{BrokerConsumer, Record};
use event_consumer::kafka::{KafkaBroker, KafkaConfig};
use event_consumer::{ConsumerConfig, ConsumerLoop, ShutdownCoordinator, spawn_consumer};
use event_store::{EventStore, StoreReader};
use trace_propagation::TracingContext;

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("event-server starting");

    // --- Load config ---
    let mut config = ServerConfig::load(args.config.as_deref())?;
    config.apply(&args);
    tracing::info!(
        config = args.config.as_deref().unwrap_or("<defaults>"),
        topic = %config.topic(),
        record = %config.record,
        brokers = %config.bootstrap_servers,
        "loaded config"
    );

    // --- Tracing backend (fatal when unreachable) ---
    let tracer_cx = match config.telemetry_config() {
        Some(telemetry) => {
            let cx = TracingContext::init(&telemetry).await?;
            tracing::info!(endpoint = %telemetry.endpoint, "span export enabled");
            Some(Arc::new(cx))
        }
        None => {
            tracing::warn!("span export disabled");
            None
        }
    };

    let result = start(&config, tracer_cx.clone()).await;

    if let Some(cx) = tracer_cx {
        // Flushing the batch exporter blocks.
        let _ = tokio::task::spawn_blocking(move || cx.shutdown()).await;
    }
    if result.is_ok() {
        tracing::info!("event-server stopped");
    }
    result
}

async fn start(
    config: &ServerConfig,
    tracer_cx: Option<Arc<TracingContext>>,
) -> Result<(), ServerError> {
    // --- CancellationToken + OS signals ---
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    let signal_listener = shutdown.listen_os_signals()?;

    let result = consume(config, tracer_cx, shutdown).await;

    signal_listener.abort();
    result
}

async fn consume(
    config: &ServerConfig,
    tracer_cx: Option<Arc<TracingContext>>,
    shutdown: ShutdownCoordinator,
) -> Result<(), ServerError> {
    let store: EventStore<Record> = EventStore::new();
    let reader = store.reader();

    let mut kafka = KafkaConfig::new(config.bootstrap_servers.clone());
    kafka.debug = config.kafka_debug.clone();
    kafka.extra = config.kafka.clone();
    let broker = KafkaBroker::connect(&kafka)?;

    let mut consumer_config = ConsumerConfig::new(config.record, config.bootstrap_servers.clone());
    consumer_config.topic = config.topic().to_string();
    consumer_config.on_decode_error = config.on_decode_error;

    let consumer = ConsumerLoop::new(broker, consumer_config, store, tracer_cx);
    supervise(consumer, shutdown, config.api_port, reader).await
}

// ═══════════════════════════════════════════════════════════════
//  Supervision
// ═══════════════════════════════════════════════════════════════

/// Run the consumer loop and the query API until a stop signal arrives or
/// the API fails. Either way the loop is drained to `Stopped` before return.
pub(crate) async fn supervise<B>(
    consumer: ConsumerLoop<B>,
    shutdown: ShutdownCoordinator,
    api_port: u16,
    reader: StoreReader<Record>,
) -> Result<(), ServerError>
where
    B: BrokerConsumer + 'static,
{
    let token = shutdown.token().clone();
    let state = consumer.state();
    let consumer_handle = spawn_consumer(consumer, shutdown.clone());

    let mut api_handle = tokio::spawn(query_api_server::run(api_port, reader, token.clone()));

    let api_result = tokio::select! {
        signal = shutdown.signalled() => {
            tracing::info!(%signal, "shutting down");
            None
        }
        res = &mut api_handle => Some(res),
    };

    // The loop drains on cancellation the same way it does on a signal.
    token.cancel();
    state.wait_for_stopped().await;
    consumer_handle.await?;

    let api_result = match api_result {
        Some(res) => res,
        None => api_handle.await,
    };
    api_result??;
    Ok(())
}
