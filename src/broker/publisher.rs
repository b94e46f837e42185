//! Publishing handle bound to one exchange and routing key

use std::sync::Arc;

use crate::geo::GeoEvent;
use crate::stats::RouterStats;

use super::error::BrokerError;
use super::key::RoutingKey;
use super::store::RoutingBroker;

/// Handle producers use to publish events for one session
///
/// Cloning is cheap; all clones publish to the same exchange and key.
#[derive(Debug, Clone)]
pub struct BrokerPublisher {
    broker: Arc<RoutingBroker>,
    exchange: Arc<str>,
    routing_key: RoutingKey,
}

impl BrokerPublisher {
    /// Create a publisher for `routing_key` on `exchange`
    pub fn new(broker: Arc<RoutingBroker>, exchange: impl AsRef<str>, routing_key: RoutingKey) -> Self {
        Self {
            broker,
            exchange: Arc::from(exchange.as_ref()),
            routing_key,
        }
    }

    /// Routing key this publisher targets
    pub fn routing_key(&self) -> &RoutingKey {
        &self.routing_key
    }

    /// Exchange this publisher targets
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Statistics of the underlying broker
    pub fn stats(&self) -> Arc<RouterStats> {
        Arc::clone(self.broker.stats())
    }

    /// Encode and publish one event
    pub fn publish(&self, event: &GeoEvent) -> Result<(), BrokerError> {
        let body = event
            .to_body()
            .map_err(|e| BrokerError::Encode(e.to_string()))?;
        self.broker.publish(&self.exchange, &self.routing_key, body)
    }
}
