//! Direct-routing message broker
//!
//! Producers publish event bodies to a direct exchange under a routing key;
//! each session owns one exclusive queue bound to its own key and polls it.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<RoutingBroker>
//!                 ┌────────────────────────────────┐
//!                 │ exchanges: { "events_exchange":│
//!                 │   bindings: key -> [QueueId] } │
//!                 │ queues: QueueId -> VecDeque    │
//!                 └───────────────┬────────────────┘
//!                                 │
//!        ┌────────────────────────┼────────────────────────┐
//!        │                        │                        │
//!        ▼                        ▼                        ▼
//!   [Producer A]             [Producer B]          [ExclusiveQueue A]
//!   publish(key=A)           publish(key=B)         poll() -> Option<Bytes>
//!        │                                                 │
//!        └──► exchange ──► bindings[A] ──► queue A ────────┘
//! ```
//!
//! # Routing
//!
//! Matching is exact: a message reaches a queue only if the queue is bound
//! with exactly the message's routing key. Messages without a matching
//! binding are dropped.
//!
//! # Polling
//!
//! `poll_queue` never waits. Consumers poll and back off on an empty queue.

pub mod config;
pub mod error;
pub mod key;
pub mod publisher;
pub mod queue;
pub mod store;

pub use config::{BrokerConfig, DEFAULT_EXCHANGE};
pub use error::BrokerError;
pub use key::{QueueId, RoutingKey};
pub use publisher::BrokerPublisher;
pub use queue::ExclusiveQueue;
pub use store::RoutingBroker;
