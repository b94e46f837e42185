//! Session configuration

use std::time::Duration;

use crate::broker::DEFAULT_EXCHANGE;
use crate::geo::{BoundingBox, NEW_YORK};
use crate::producer::ProducerKind;

/// Settings shared by every session of a registry
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Exchange producers publish to and queues bind on
    pub exchange: String,

    /// Box a newly connected session starts with
    pub default_box: BoundingBox,

    /// Pause after an empty poll
    pub poll_backoff: Duration,

    /// Producer given to every session
    pub producer: ProducerKind,
}

/// Box sessions start with unless configured otherwise
pub fn default_box() -> BoundingBox {
    NEW_YORK
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            default_box: default_box(),
            poll_backoff: Duration::from_millis(500),
            producer: ProducerKind::default(),
        }
    }
}

impl SessionConfig {
    /// Set the exchange name
    pub fn exchange(mut self, name: impl Into<String>) -> Self {
        self.exchange = name.into();
        self
    }

    /// Set the initial box
    pub fn default_box(mut self, bbox: BoundingBox) -> Self {
        self.default_box = bbox;
        self
    }

    /// Set the empty-poll backoff
    pub fn poll_backoff(mut self, backoff: Duration) -> Self {
        self.poll_backoff = backoff;
        self
    }

    /// Set the producer kind
    pub fn producer(mut self, kind: ProducerKind) -> Self {
        self.producer = kind;
        self
    }
}
