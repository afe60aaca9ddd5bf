pub mod error;
mod consumer;
mod shutdown;
mod state;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use consumer::{
    ConsumerConfig, ConsumerExit, ConsumerLoop, ConsumerStats, DecodeErrorPolicy, spawn_consumer,
};
pub use error::ConsumerError;
pub use shutdown::{ShutdownCoordinator, StopSignal};
pub use state::ConsumerStateCell;
