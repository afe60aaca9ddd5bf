use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tokio::task::JoinHandle;

use event_api::{
    BrokerConsumer, BrokerEvent, ConsumerState, InboundMessage, Record, RecordKind,
    TRACEPARENT_HEADER,
};
use event_store::EventStore;
use trace_propagation::{
    ConsumerSpan, KeyValue, TraceParseError, TracingContext, extract_context, start_consumer_span,
};

use crate::error::ConsumerError;
use crate::shutdown::{ShutdownCoordinator, StopSignal};
use crate::state::ConsumerStateCell;

// ═══════════════════════════════════════════════════════════════
//  Config
// ═══════════════════════════════════════════════════════════════

/// What to do with a message whose body does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorPolicy {
    /// Release the broker and stop the loop.
    #[default]
    Stop,
    /// Log, count and continue with the next message.
    Skip,
}

impl FromStr for DecodeErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(DecodeErrorPolicy::Stop),
            "skip" => Ok(DecodeErrorPolicy::Skip),
            other => Err(format!("unknown decode error policy '{other}' (expected 'stop' or 'skip')")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub topic: String,
    pub record_kind: RecordKind,
    /// Reported on spans as `messaging.url`.
    pub broker_url: String,
    pub on_decode_error: DecodeErrorPolicy,
}

impl ConsumerConfig {
    pub fn new(record_kind: RecordKind, broker_url: impl Into<String>) -> Self {
        Self {
            topic: record_kind.default_topic().to_string(),
            record_kind,
            broker_url: broker_url.into(),
            on_decode_error: DecodeErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsumerStats {
    consumed: AtomicU64,
    skipped: AtomicU64,
}

impl ConsumerStats {
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerExit {
    Signal(StopSignal),
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════
//  BrokerGuard — close() exactly once
// ═══════════════════════════════════════════════════════════════

struct BrokerGuard<B: BrokerConsumer> {
    inner: B,
    released: bool,
}

impl<B: BrokerConsumer> BrokerGuard<B> {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.inner.close();
        tracing::info!("broker connection released");
    }
}

impl<B: BrokerConsumer> Drop for BrokerGuard<B> {
    fn drop(&mut self) {
        self.release();
    }
}

// ═══════════════════════════════════════════════════════════════
//  ConsumerLoop
// ═══════════════════════════════════════════════════════════════

/// Owns the broker connection, decodes every message into the store and
/// wraps each one in a consumer span when the producer sent a trace context.
pub struct ConsumerLoop<B: BrokerConsumer> {
    broker: BrokerGuard<B>,
    config: ConsumerConfig,
    store: EventStore<Record>,
    tracing: Option<Arc<TracingContext>>,
    state: ConsumerStateCell,
    stats: Arc<ConsumerStats>,
}

enum Next {
    Stop(ConsumerExit),
    Event(BrokerEvent),
}

impl<B: BrokerConsumer> ConsumerLoop<B> {
    pub fn new(
        broker: B,
        config: ConsumerConfig,
        store: EventStore<Record>,
        tracing: Option<Arc<TracingContext>>,
    ) -> Self {
        Self {
            broker: BrokerGuard {
                inner: broker,
                released: false,
            },
            config,
            store,
            tracing,
            state: ConsumerStateCell::new(),
            stats: Arc::new(ConsumerStats::default()),
        }
    }

    pub fn state(&self) -> ConsumerStateCell {
        self.state.clone()
    }

    pub fn stats(&self) -> Arc<ConsumerStats> {
        self.stats.clone()
    }

    /// Consume until a stop signal, cancellation, broker error or (with
    /// [`DecodeErrorPolicy::Stop`]) an undecodable message. The broker is
    /// released and the state is `Stopped` on return.
    pub async fn run(mut self, shutdown: ShutdownCoordinator) -> Result<ConsumerExit, ConsumerError> {
        let result = self.consume(&shutdown).await;
        if let Err(e) = &result {
            tracing::error!(topic = %self.config.topic, error = %e, "consumer loop terminated");
        }
        self.finish();
        result
    }

    async fn consume(&mut self, shutdown: &ShutdownCoordinator) -> Result<ConsumerExit, ConsumerError> {
        self.broker.inner.subscribe(&self.config.topic)?;
        self.state.advance(ConsumerState::Running);
        tracing::info!(
            topic = %self.config.topic,
            record = %self.config.record_kind,
            policy = ?self.config.on_decode_error,
            "subscribed"
        );

        loop {
            let next = tokio::select! {
                biased;
                signal = shutdown.signalled() => Next::Stop(ConsumerExit::Signal(signal)),
                _ = shutdown.token().cancelled() => Next::Stop(ConsumerExit::Cancelled),
                event = self.broker.inner.recv() => Next::Event(event),
            };

            match next {
                Next::Stop(exit) => {
                    tracing::info!(topic = %self.config.topic, reason = ?exit, "stop requested");
                    self.state.advance(ConsumerState::Draining);
                    return Ok(exit);
                }
                Next::Event(BrokerEvent::Error(e)) => return Err(e.into()),
                Next::Event(BrokerEvent::Message(msg)) => self.handle_message(msg).await?,
            }
        }
    }

    async fn handle_message(&mut self, msg: InboundMessage) -> Result<(), ConsumerError> {
        tracing::debug!(
            topic = %msg.topic,
            partition = msg.partition,
            offset = msg.offset,
            bytes = msg.value.len(),
            "message received"
        );

        // Ended on every path out of this function.
        let mut span = self.open_span(&msg);

        match self.config.record_kind.decode(&msg.value) {
            Ok(record) => {
                self.store.append(record).await;
                self.stats.consumed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                if let Some(span) = span.as_mut() {
                    span.set_error(e.to_string());
                }
                match self.config.on_decode_error {
                    DecodeErrorPolicy::Stop => Err(e.into()),
                    DecodeErrorPolicy::Skip => {
                        self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            partition = msg.partition,
                            offset = msg.offset,
                            error = %e,
                            "bad record, skipping"
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    fn open_span(&self, msg: &InboundMessage) -> Option<ConsumerSpan> {
        let tracer_cx = self.tracing.as_deref()?;
        let header = msg.header(TRACEPARENT_HEADER).map(String::from_utf8_lossy);

        let parent = match extract_context(header.as_deref()) {
            Ok(parent) => parent,
            Err(TraceParseError::Missing) => return None,
            Err(e) => {
                tracing::warn!(offset = msg.offset, error = %e, "ignoring malformed traceparent");
                return None;
            }
        };

        let attrs = vec![
            KeyValue::new("messaging.url", self.config.broker_url.clone()),
            KeyValue::new("messaging.kafka.partition", i64::from(msg.partition)),
            KeyValue::new("messaging.kafka.offset", msg.offset),
        ];
        Some(start_consumer_span(tracer_cx, &self.config.topic, Some(&parent), attrs))
    }

    fn finish(&mut self) {
        self.broker.release();
        if self.state.advance(ConsumerState::Stopped) {
            tracing::info!(
                topic = %self.config.topic,
                consumed = self.stats.consumed(),
                skipped = self.stats.skipped(),
                "consumer stopped"
            );
        }
    }
}

impl<B: BrokerConsumer> Drop for ConsumerLoop<B> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Run `consumer` on its own task. Observers follow
/// the loop through its [`ConsumerStateCell`].
pub fn spawn_consumer<B>(consumer: ConsumerLoop<B>, shutdown: ShutdownCoordinator) -> JoinHandle<()>
where
    B: BrokerConsumer + 'static,
{
    tokio::spawn(async move {
        // Fatal errors are already logged by `run`.
        if let Ok(exit) = consumer.run(shutdown).await {
            tracing::info!(reason = ?exit, "consumer finished");
        }
    })
}
