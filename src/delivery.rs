//! Delivery boundary
//!
//! Sessions push [`ClientEvent`]s through a [`Delivery`] implementation,
//! addressed by session id. Delivery is one-way, at-most-once and never
//! reports failure back to the session.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::geo::{GeoEvent, LatLng};
use crate::session::SessionId;

/// Event pushed to a client
///
/// Serializes as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Session is streaming; echoes the initial box
    Connected {
        /// Session id
        ws_id: String,
        /// South-west corner of the initial box
        sw: LatLng,
        /// North-east corner of the initial box
        ne: LatLng,
    },
    /// A new event inside the client's box
    NewEvent(GeoEvent),
}

impl ClientEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Connected { .. } => "connected",
            ClientEvent::NewEvent(_) => "new_event",
        }
    }
}

/// Push side of the transport
///
/// Implementations must not block: `emit` is called from consumer loops.
pub trait Delivery: Send + Sync + 'static {
    /// Push an event to one session; silently dropped if it cannot be sent
    fn emit(&self, session: &SessionId, event: ClientEvent);
}

/// Delivery into per-session bounded channels
///
/// The transport attaches a receiver per connection. Events for sessions
/// without a receiver, or whose channel is full, are dropped.
#[derive(Debug)]
pub struct ChannelDelivery {
    targets: RwLock<HashMap<SessionId, mpsc::Sender<ClientEvent>>>,
    capacity: usize,
}

impl ChannelDelivery {
    /// Create a delivery whose channels hold up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Attach a receiver for a session, replacing any previous one
    pub fn attach(&self, session: &SessionId) -> mpsc::Receiver<ClientEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.targets.write().insert(session.clone(), tx);
        rx
    }

    /// Detach a session's receiver
    pub fn detach(&self, session: &SessionId) -> bool {
        self.targets.write().remove(session).is_some()
    }

    /// Number of attached sessions
    pub fn attached_count(&self) -> usize {
        self.targets.read().len()
    }
}

impl Default for ChannelDelivery {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Delivery for ChannelDelivery {
    fn emit(&self, session: &SessionId, event: ClientEvent) {
        let targets = self.targets.read();
        let Some(tx) = targets.get(session) else {
            tracing::trace!(session_id = %session, event = event.name(), "No receiver attached");
            return;
        };

        if let Err(e) = tx.try_send(event) {
            tracing::debug!(session_id = %session, error = %e, "Client event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = ClientEvent::NewEvent(GeoEvent::new("hi", 40.5, -73.5));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"event": "new_event", "data": {"text": "hi", "lat": 40.5, "lng": -73.5}})
        );

        let connected = ClientEvent::Connected {
            ws_id: "abc".into(),
            sw: LatLng::new(40.0, -74.0),
            ne: LatLng::new(41.0, -73.0),
        };
        let value = serde_json::to_value(&connected).unwrap();
        assert_eq!(value["event"], "connected");
        assert_eq!(value["data"]["ws_id"], "abc");
        assert_eq!(value["data"]["sw"]["lng"], -74.0);
    }

    #[tokio::test]
    async fn test_emit_targets_one_session() {
        let delivery = ChannelDelivery::default();
        let a = SessionId::new("a");
        let b = SessionId::new("b");
        let mut rx_a = delivery.attach(&a);
        let mut rx_b = delivery.attach(&b);

        delivery.emit(&a, ClientEvent::NewEvent(GeoEvent::new("for a", 0.0, 0.0)));

        assert_eq!(
            rx_a.recv().await,
            Some(ClientEvent::NewEvent(GeoEvent::new("for a", 0.0, 0.0)))
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_emit_without_receiver_or_when_full_is_silent() {
        let delivery = ChannelDelivery::new(1);
        let a = SessionId::new("a");
        delivery.emit(&a, ClientEvent::NewEvent(GeoEvent::new("x", 0.0, 0.0)));

        let mut rx = delivery.attach(&a);
        delivery.emit(&a, ClientEvent::NewEvent(GeoEvent::new("1", 0.0, 0.0)));
        delivery.emit(&a, ClientEvent::NewEvent(GeoEvent::new("2", 0.0, 0.0)));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        assert!(delivery.detach(&a));
        assert!(!delivery.detach(&a));
        assert_eq!(delivery.attached_count(), 0);
    }
}
