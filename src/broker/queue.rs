//! Queues and exclusive queue ownership

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;

use super::key::QueueId;
use super::store::RoutingBroker;

/// Bounded FIFO of message bodies
#[derive(Debug)]
pub(super) struct MessageQueue {
    messages: VecDeque<Bytes>,
    capacity: usize,
}

impl MessageQueue {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Push a message, discarding the oldest one if full
    ///
    /// Returns true if a message was discarded.
    pub(super) fn push(&mut self, body: Bytes) -> bool {
        let overflowed = if self.messages.len() >= self.capacity {
            self.messages.pop_front();
            true
        } else {
            false
        };
        self.messages.push_back(body);
        overflowed
    }

    pub(super) fn pop(&mut self) -> Option<Bytes> {
        self.messages.pop_front()
    }

    pub(super) fn len(&self) -> usize {
        self.messages.len()
    }
}

/// A queue owned by exactly one consumer
///
/// Dropping the guard reclaims the queue and removes every binding that
/// points at it, so nothing published afterwards can reach it.
#[derive(Debug)]
pub struct ExclusiveQueue {
    id: QueueId,
    broker: Arc<RoutingBroker>,
}

impl ExclusiveQueue {
    pub(super) fn new(id: QueueId, broker: Arc<RoutingBroker>) -> Self {
        Self { id, broker }
    }

    /// Queue identifier
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Take the next message without waiting
    pub fn poll(&self) -> Option<Bytes> {
        self.broker.poll_queue(self.id)
    }

    /// Number of messages waiting
    pub fn len(&self) -> usize {
        self.broker.queue_len(self.id).unwrap_or(0)
    }

    /// Whether no message is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ExclusiveQueue {
    fn drop(&mut self) {
        self.broker.delete_queue(self.id);
    }
}
