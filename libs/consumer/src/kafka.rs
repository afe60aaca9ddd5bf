//! Kafka implementation of [`BrokerConsumer`] on top of `rdkafka`.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};

use event_api::{BrokerConsumer, BrokerError, BrokerEvent, InboundMessage, MessageHeader};

pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    /// Fresh per process so a restart never resumes an old group's offsets.
    pub group_id: String,
    pub auto_offset_reset: String,
    /// librdkafka debug contexts, e.g. `consumer`.
    pub debug: Option<String>,
    /// Passed through to librdkafka verbatim. Cannot override the keys set above.
    pub extra: BTreeMap<String, String>,
}

impl KafkaConfig {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            group_id: uuid::Uuid::new_v4().to_string(),
            auto_offset_reset: "earliest".to_string(),
            debug: None,
            extra: BTreeMap::new(),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut cfg = ClientConfig::new();
        for (key, value) in &self.extra {
            cfg.set(key, value);
        }
        cfg.set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", &self.group_id)
            // Offsets are never committed by this consumer.
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset);
        if let Some(debug) = &self.debug {
            cfg.set("debug", debug);
        }
        cfg
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BOOTSTRAP_SERVERS)
    }
}

pub struct KafkaBroker {
    consumer: Option<StreamConsumer>,
}

impl KafkaBroker {
    pub fn connect(config: &KafkaConfig) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = config
            .client_config()
            .create()
            .map_err(|e| BrokerError::Create(e.to_string()))?;
        tracing::info!(
            brokers = %config.bootstrap_servers,
            group = %config.group_id,
            "kafka consumer created"
        );
        Ok(Self {
            consumer: Some(consumer),
        })
    }
}

impl BrokerConsumer for KafkaBroker {
    fn subscribe(&mut self, topic: &str) -> Result<(), BrokerError> {
        let consumer = self.consumer.as_ref().ok_or(BrokerError::Closed)?;
        consumer
            .subscribe(&[topic])
            .map_err(|e| BrokerError::Subscribe {
                topic: topic.to_string(),
                detail: e.to_string(),
            })
    }

    fn recv(&mut self) -> Pin<Box<dyn Future<Output = BrokerEvent> + Send + '_>> {
        Box::pin(async move {
            let Some(consumer) = self.consumer.as_ref() else {
                return BrokerEvent::Error(BrokerError::Closed);
            };
            match consumer.recv().await {
                Ok(msg) => BrokerEvent::Message(to_inbound(&msg)),
                Err(e) => BrokerEvent::Error(BrokerError::Receive(e.to_string())),
            }
        })
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
        }
    }
}

fn to_inbound(msg: &BorrowedMessage<'_>) -> InboundMessage {
    let headers = msg
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|h| MessageHeader {
                    key: h.key.to_string(),
                    value: h.value.map(<[u8]>::to_vec).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    InboundMessage {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(<[u8]>::to_vec),
        value: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_is_unique_per_config() {
        let a = KafkaConfig::default();
        let b = KafkaConfig::default();
        assert_ne!(a.group_id, b.group_id);
        assert_eq!(a.bootstrap_servers, DEFAULT_BOOTSTRAP_SERVERS);
    }

    #[test]
    fn client_config_disables_auto_commit() {
        let mut config = KafkaConfig::new("broker:29092");
        config.debug = Some("consumer".into());
        let cfg = config.client_config();
        assert_eq!(cfg.get("enable.auto.commit"), Some("false"));
        assert_eq!(cfg.get("bootstrap.servers"), Some("broker:29092"));
        assert_eq!(cfg.get("auto.offset.reset"), Some("earliest"));
        assert_eq!(cfg.get("debug"), Some("consumer"));
    }

    #[test]
    fn extra_properties_pass_through_but_cannot_enable_commits() {
        let mut config = KafkaConfig::default();
        config.extra.insert("session.timeout.ms".into(), "6000".into());
        config.extra.insert("enable.auto.commit".into(), "true".into());
        let cfg = config.client_config();
        assert_eq!(cfg.get("session.timeout.ms"), Some("6000"));
        assert_eq!(cfg.get("enable.auto.commit"), Some("false"));
    }
}
