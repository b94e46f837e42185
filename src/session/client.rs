//! Client session
//!
//! One session per connected client. It owns an exclusive queue bound to
//! its routing key for its whole life, one producer for its current box, and
//! one consumer loop forwarding queued events to the delivery boundary.
//!
//! A location change replaces only the producer; the queue and binding stay.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::{BrokerPublisher, ExclusiveQueue, QueueId, RoutingBroker, RoutingKey};
use crate::delivery::{ClientEvent, Delivery};
use crate::geo::{BoundingBox, GeoEvent, LatLng};
use crate::producer::EventProducer;
use crate::stats::RouterStats;

use super::config::SessionConfig;
use super::error::SessionError;
use super::id::SessionId;
use super::state::{SessionPhase, SessionState};

/// New location for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationUpdate {
    /// Explicit corner pair
    Bounds(BoundingBox),
    /// Square of half-width 0.5° around a point
    Center(LatLng),
}

impl LocationUpdate {
    /// Resolve to a concrete box
    pub fn resolve(&self) -> Result<BoundingBox, SessionError> {
        match self {
            LocationUpdate::Bounds(bbox) => Ok(*bbox),
            LocationUpdate::Center(center) => Ok(BoundingBox::around(*center)?),
        }
    }
}

/// Consumer loop handle
#[derive(Debug)]
struct Consumer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// A client's routing key, producer and consumer loop
pub struct ClientSession {
    id: SessionId,
    routing_key: RoutingKey,
    state: SessionState,
    queue_id: Option<QueueId>,
    producer: Option<EventProducer>,
    consumer: Option<Consumer>,
    broker: Arc<RoutingBroker>,
    delivery: Arc<dyn Delivery>,
    config: Arc<SessionConfig>,
}

impl ClientSession {
    /// Create a session in the `Created` phase
    pub fn new(
        id: SessionId,
        bbox: BoundingBox,
        broker: Arc<RoutingBroker>,
        delivery: Arc<dyn Delivery>,
        config: Arc<SessionConfig>,
    ) -> Self {
        let routing_key = id.routing_key();
        Self {
            id,
            routing_key,
            state: SessionState::new(bbox),
            queue_id: None,
            producer: None,
            consumer: None,
            broker,
            delivery,
            config,
        }
    }

    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Routing key, fixed for the session's life
    pub fn routing_key(&self) -> &RoutingKey {
        &self.routing_key
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Box the current producer serves
    pub fn current_box(&self) -> BoundingBox {
        self.state.bbox
    }

    /// Exclusive queue id, once started
    pub fn queue_id(&self) -> Option<QueueId> {
        self.queue_id
    }

    /// Completed location updates
    pub fn location_updates(&self) -> u64 {
        self.state.location_updates
    }

    /// Whether the current producer task is alive
    pub fn is_producer_running(&self) -> bool {
        self.producer.as_ref().is_some_and(EventProducer::is_running)
    }

    /// Bind the queue, start the producer and the consumer loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state.phase != SessionPhase::Created {
            return Err(SessionError::InvalidPhase {
                expected: SessionPhase::Created,
                actual: self.state.phase,
            });
        }

        // Queue is reclaimed on early return when the guard drops
        let queue = self.broker.create_exclusive_queue();
        self.broker
            .bind_queue(&self.config.exchange, queue.id(), &self.routing_key)?;
        self.queue_id = Some(queue.id());

        self.producer = Some(self.start_producer(self.state.bbox));
        self.consumer = Some(self.spawn_consumer(queue));
        self.state.start_streaming();
        self.broker.stats().session_started();

        tracing::info!(
            session_id = %self.id,
            bbox = %self.state.bbox,
            producer = self.config.producer.name(),
            "Session started"
        );
        Ok(())
    }

    /// Replace the producer with one for a new box
    ///
    /// The new box is resolved before anything is stopped, so an invalid
    /// update leaves the current producer running. Returns false when the
    /// session is not streaming.
    pub fn update_location(&mut self, update: LocationUpdate) -> Result<bool, SessionError> {
        let bbox = update.resolve()?;

        if !self.state.begin_update() {
            tracing::debug!(
                session_id = %self.id,
                phase = ?self.state.phase,
                "Location update ignored"
            );
            return Ok(false);
        }

        if let Some(old) = self.producer.take() {
            old.stop();
        }
        self.producer = Some(self.start_producer(bbox));
        self.state.finish_update(bbox);

        tracing::info!(session_id = %self.id, bbox = %bbox, "Session location updated");
        Ok(true)
    }

    /// Stop the producer and signal the consumer loop to exit
    ///
    /// The queue is reclaimed once the consumer loop has exited. Returns
    /// false if the session was already closed.
    pub fn close(&mut self) -> bool {
        let Some(previous) = self.state.close() else {
            return false;
        };

        if let Some(producer) = self.producer.take() {
            producer.stop();
        }
        if let Some(consumer) = &self.consumer {
            consumer.cancel.cancel();
        }

        if previous != SessionPhase::Created {
            self.broker.stats().session_closed();
        }

        tracing::info!(
            session_id = %self.id,
            location_updates = self.state.location_updates,
            "Session closed"
        );
        true
    }

    /// Close and wait for the consumer loop to exit
    ///
    /// When this returns, the session's queue no longer exists.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.handle.await {
                tracing::warn!(session_id = %self.id, error = %e, "Consumer task failed");
            }
        }
    }

    fn start_producer(&self, bbox: BoundingBox) -> EventProducer {
        let publisher = BrokerPublisher::new(
            Arc::clone(&self.broker),
            &self.config.exchange,
            self.routing_key.clone(),
        );
        EventProducer::start(&self.config.producer, bbox, publisher)
    }

    fn spawn_consumer(&self, queue: ExclusiveQueue) -> Consumer {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(consume_loop(
            queue,
            self.id.clone(),
            Arc::clone(&self.delivery),
            Arc::clone(self.broker.stats()),
            self.config.poll_backoff,
            cancel.clone(),
        ));
        Consumer { cancel, handle }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("phase", &self.state.phase)
            .field("bbox", &self.state.bbox)
            .field("queue_id", &self.queue_id)
            .finish_non_exhaustive()
    }
}

/// Poll the session queue and push events until cancelled
///
/// Owns the queue guard: the queue is reclaimed when the loop returns.
async fn consume_loop(
    queue: ExclusiveQueue,
    session_id: SessionId,
    delivery: Arc<dyn Delivery>,
    stats: Arc<RouterStats>,
    backoff: Duration,
    cancel: CancellationToken,
) {
    tracing::debug!(session_id = %session_id, queue = %queue.id(), "Consumer started");

    while !cancel.is_cancelled() {
        match queue.poll() {
            Some(body) => {
                match GeoEvent::from_body(&body) {
                    Ok(event) => {
                        delivery.emit(&session_id, ClientEvent::NewEvent(event));
                        stats.record_delivered();
                    }
                    Err(e) => {
                        tracing::debug!(session_id = %session_id, error = %e, "Dropped undecodable message");
                    }
                }
                tokio::task::yield_now().await;
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    tracing::debug!(session_id = %session_id, "Consumer stopped");
}
