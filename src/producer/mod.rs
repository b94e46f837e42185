//! Event producers
//!
//! A producer publishes events for one bounding box under one routing key.
//! There are exactly two kinds:
//!
//! - [`SimulatedProducer`]: random events inside the box on a jittered timer
//! - [`LiveProducer`]: items from an external feed filtered by the box
//!
//! Both run on their own tokio task and stop through a cancellation token,
//! so `stop` can be called from any task, any number of times.

pub mod config;
pub mod error;
pub mod live;
pub mod simulated;
mod task;

pub use config::{LiveConfig, ProducerKind, SimulatedConfig};
pub use error::ProducerError;
pub use live::LiveProducer;
pub use simulated::SimulatedProducer;

use crate::broker::BrokerPublisher;
use crate::geo::BoundingBox;

/// A running producer of either kind
#[derive(Debug)]
pub enum EventProducer {
    /// Random generator
    Simulated(SimulatedProducer),
    /// External feed
    Live(LiveProducer),
}

impl EventProducer {
    /// Start the producer selected by `kind` for `bbox`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(kind: &ProducerKind, bbox: BoundingBox, publisher: BrokerPublisher) -> Self {
        match kind {
            ProducerKind::Simulated(config) => {
                EventProducer::Simulated(SimulatedProducer::start(config.clone(), bbox, publisher))
            }
            ProducerKind::Live(config) => {
                EventProducer::Live(LiveProducer::start(config.clone(), bbox, publisher))
            }
        }
    }

    /// Stop producing; idempotent and safe from any task
    pub fn stop(&self) {
        match self {
            EventProducer::Simulated(p) => p.stop(),
            EventProducer::Live(p) => p.stop(),
        }
    }

    /// Whether the producer task is still alive
    pub fn is_running(&self) -> bool {
        match self {
            EventProducer::Simulated(p) => p.is_running(),
            EventProducer::Live(p) => p.is_running(),
        }
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        match self {
            EventProducer::Simulated(p) => p.is_stopped(),
            EventProducer::Live(p) => p.is_stopped(),
        }
    }

    /// Box this producer serves
    pub fn bbox(&self) -> BoundingBox {
        match self {
            EventProducer::Simulated(p) => p.bbox(),
            EventProducer::Live(p) => p.bbox(),
        }
    }

    /// Short name for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            EventProducer::Simulated(_) => "simulated",
            EventProducer::Live(_) => "live",
        }
    }
}
