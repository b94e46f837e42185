//! Routing broker implementation
//!
//! The in-process message bus shared by every session. Exchanges hold
//! routing-key bindings; queues hold message bodies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::stats::RouterStats;

use super::config::BrokerConfig;
use super::error::BrokerError;
use super::key::{QueueId, RoutingKey};
use super::queue::{ExclusiveQueue, MessageQueue};

/// A direct exchange: routing key to bound queues
#[derive(Debug, Default)]
struct Exchange {
    bindings: HashMap<RoutingKey, Vec<QueueId>>,
}

impl Exchange {
    fn unbind_queue(&mut self, queue: QueueId) {
        self.bindings.retain(|_, queues| {
            queues.retain(|q| *q != queue);
            !queues.is_empty()
        });
    }
}

/// Central message bus for all sessions
///
/// Thread-safe via `parking_lot` locks that are never held across an await
/// point, so publish and poll are plain synchronous calls usable from any
/// task. The exchange map and the queue map are never locked at the same
/// time.
#[derive(Debug)]
pub struct RoutingBroker {
    /// Exchanges by name
    exchanges: RwLock<HashMap<String, Exchange>>,

    /// Live queues by id
    queues: RwLock<HashMap<QueueId, Arc<Mutex<MessageQueue>>>>,

    next_queue_id: AtomicU64,

    /// Configuration
    config: BrokerConfig,

    stats: Arc<RouterStats>,
}

impl RoutingBroker {
    /// Create a new broker with default configuration
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Create a new broker with custom configuration
    pub fn with_config(config: BrokerConfig) -> Self {
        Self::with_stats(config, Arc::new(RouterStats::new()))
    }

    /// Create a new broker reporting into shared statistics
    pub fn with_stats(config: BrokerConfig, stats: Arc<RouterStats>) -> Self {
        Self {
            exchanges: RwLock::new(HashMap::new()),
            queues: RwLock::new(HashMap::new()),
            next_queue_id: AtomicU64::new(1),
            config,
            stats,
        }
    }

    /// Get the broker configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Get the shared statistics
    pub fn stats(&self) -> &Arc<RouterStats> {
        &self.stats
    }

    /// Declare a direct exchange
    ///
    /// Idempotent: declaring an existing exchange leaves its bindings intact.
    pub fn declare_exchange(&self, name: &str) {
        let mut exchanges = self.exchanges.write();
        if !exchanges.contains_key(name) {
            exchanges.insert(name.to_string(), Exchange::default());
            tracing::info!(exchange = name, "Exchange declared");
        }
    }

    /// Delete an exchange together with all of its bindings
    ///
    /// Returns false if the exchange did not exist.
    pub fn delete_exchange(&self, name: &str) -> bool {
        let removed = self.exchanges.write().remove(name).is_some();
        if removed {
            tracing::info!(exchange = name, "Exchange deleted");
        }
        removed
    }

    /// Check whether an exchange exists
    pub fn has_exchange(&self, name: &str) -> bool {
        self.exchanges.read().contains_key(name)
    }

    /// Fail with `BrokerUnavailable` unless the exchange exists
    pub fn ensure_exchange(&self, name: &str) -> Result<(), BrokerError> {
        if self.has_exchange(name) {
            Ok(())
        } else {
            Err(BrokerError::BrokerUnavailable(name.to_string()))
        }
    }

    /// Allocate a queue owned by a single consumer
    ///
    /// The queue lives exactly as long as the returned guard.
    pub fn create_exclusive_queue(self: &Arc<Self>) -> ExclusiveQueue {
        let id = QueueId(self.next_queue_id.fetch_add(1, Ordering::Relaxed));
        self.queues.write().insert(
            id,
            Arc::new(Mutex::new(MessageQueue::new(self.config.queue_capacity))),
        );

        tracing::debug!(queue = %id, "Exclusive queue created");
        ExclusiveQueue::new(id, Arc::clone(self))
    }

    /// Bind a queue to a routing key on an exchange
    ///
    /// Only messages published with exactly this key reach the queue.
    /// Binding the same pair twice has no further effect.
    pub fn bind_queue(
        &self,
        exchange: &str,
        queue: QueueId,
        key: &RoutingKey,
    ) -> Result<(), BrokerError> {
        if !self.queues.read().contains_key(&queue) {
            return Err(BrokerError::QueueNotFound(queue));
        }

        let mut exchanges = self.exchanges.write();
        let entry = exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::BrokerUnavailable(exchange.to_string()))?;

        let bound = entry.bindings.entry(key.clone()).or_default();
        if !bound.contains(&queue) {
            bound.push(queue);
        }

        tracing::debug!(exchange, queue = %queue, routing_key = %key, "Queue bound");
        Ok(())
    }

    /// Publish a message body under a routing key
    ///
    /// Fire-and-forget: a key with no bound queue drops the message without
    /// error. Fails only when the exchange does not exist.
    pub fn publish(&self, exchange: &str, key: &RoutingKey, body: Bytes) -> Result<(), BrokerError> {
        let targets = {
            let exchanges = self.exchanges.read();
            let entry = exchanges
                .get(exchange)
                .ok_or_else(|| BrokerError::BrokerUnavailable(exchange.to_string()))?;
            entry.bindings.get(key).cloned().unwrap_or_default()
        };

        self.stats.record_published();

        let mut delivered = false;
        {
            let queues = self.queues.read();
            for id in targets {
                if let Some(queue) = queues.get(&id) {
                    if queue.lock().push(body.clone()) {
                        self.stats.record_overflow();
                        tracing::debug!(queue = %id, routing_key = %key, "Queue full, oldest message dropped");
                    }
                    delivered = true;
                }
            }
        }

        if delivered {
            self.stats.record_routed();
        } else {
            self.stats.record_unroutable();
            tracing::trace!(exchange, routing_key = %key, "Unroutable message dropped");
        }

        Ok(())
    }

    /// Take the next message from a queue without waiting
    ///
    /// Returns `None` immediately when the queue is empty or no longer exists.
    pub fn poll_queue(&self, queue: QueueId) -> Option<Bytes> {
        let entry = self.queues.read().get(&queue).cloned()?;
        let body = entry.lock().pop();
        body
    }

    /// Number of messages waiting in a queue
    pub fn queue_len(&self, queue: QueueId) -> Option<usize> {
        let entry = self.queues.read().get(&queue).cloned()?;
        let len = entry.lock().len();
        Some(len)
    }

    /// Check whether a queue exists
    pub fn queue_exists(&self, queue: QueueId) -> bool {
        self.queues.read().contains_key(&queue)
    }

    /// Number of live queues
    pub fn queue_count(&self) -> usize {
        self.queues.read().len()
    }

    /// Number of queues bound to a key on an exchange
    pub fn binding_count(&self, exchange: &str, key: &RoutingKey) -> usize {
        self.exchanges
            .read()
            .get(exchange)
            .and_then(|e| e.bindings.get(key).map(Vec::len))
            .unwrap_or(0)
    }

    /// Reclaim a queue and drop every binding that targets it
    pub(super) fn delete_queue(&self, queue: QueueId) {
        let removed = self.queues.write().remove(&queue).is_some();

        for exchange in self.exchanges.write().values_mut() {
            exchange.unbind_queue(queue);
        }

        if removed {
            tracing::debug!(queue = %queue, "Exclusive queue reclaimed");
        }
    }
}

impl Default for RoutingBroker {
    fn default() -> Self {
        Self::new()
    }
}
