pub mod broker;
pub mod error;
pub mod record;
pub mod state;

pub use broker::{BrokerConsumer, BrokerEvent, InboundMessage, MessageHeader, TRACEPARENT_HEADER};
pub use error::{BrokerError, DecodeError};
pub use record::{DollarsByZip, Record, RecordKind, StargazerEvent};
pub use state::ConsumerState;
