//! Session registry
//!
//! Owns every live [`ClientSession`], keyed by session id. Transport code
//! only talks to the registry: connect creates, disconnect destroys, and a
//! bounds change looks the session up.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::broker::RoutingBroker;
use crate::delivery::Delivery;
use crate::geo::BoundingBox;
use crate::stats::StatsSnapshot;

use super::client::{ClientSession, LocationUpdate};
use super::config::SessionConfig;
use super::error::SessionError;
use super::id::SessionId;

/// Registry of all live sessions
///
/// Thread-safe via `RwLock`. Connect, disconnect and bounds changes take the
/// write lock; queries share the read lock. Closing a removed session happens
/// after the lock is released.
pub struct SessionRegistry {
    /// Map of session id to session
    sessions: RwLock<HashMap<SessionId, ClientSession>>,

    broker: Arc<RoutingBroker>,
    delivery: Arc<dyn Delivery>,

    /// Configuration
    config: Arc<SessionConfig>,
}

impl SessionRegistry {
    /// Create a registry on top of a broker
    ///
    /// Fails with `BrokerUnavailable` if the configured exchange has not been
    /// declared, so a misconfigured process stops before accepting clients.
    pub fn new(
        broker: Arc<RoutingBroker>,
        delivery: Arc<dyn Delivery>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        broker.ensure_exchange(&config.exchange)?;

        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            broker,
            delivery,
            config: Arc::new(config),
        })
    }

    /// Get the session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the broker
    pub fn broker(&self) -> &Arc<RoutingBroker> {
        &self.broker
    }

    /// Start a session for a new connection
    ///
    /// Returns the box the session streams for. Connecting an id that already
    /// has a session changes nothing and returns that session's current box.
    pub async fn on_connect(&self, id: &SessionId) -> Result<BoundingBox, SessionError> {
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(id) {
            tracing::debug!(session_id = %id, "Duplicate connect ignored");
            return Ok(existing.current_box());
        }

        let bbox = self.config.default_box;
        let mut session = ClientSession::new(
            id.clone(),
            bbox,
            Arc::clone(&self.broker),
            Arc::clone(&self.delivery),
            Arc::clone(&self.config),
        );
        session.start()?;
        sessions.insert(id.clone(), session);

        tracing::info!(session_id = %id, sessions = sessions.len(), "Session registered");
        Ok(bbox)
    }

    /// Remove and close a session
    ///
    /// Returns false if no session exists for `id`. When this returns true,
    /// the session's queue has been reclaimed.
    pub async fn on_disconnect(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id);

        match removed {
            Some(session) => {
                session.shutdown().await;
                tracing::info!(session_id = %id, "Session unregistered");
                true
            }
            None => {
                tracing::debug!(session_id = %id, "Disconnect for unknown session");
                false
            }
        }
    }

    /// Move a session to a new location
    ///
    /// An unknown id is a stale message: no effect, returns `Ok(false)`.
    pub async fn on_bounds_changed(
        &self,
        id: &SessionId,
        update: LocationUpdate,
    ) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.write().await;

        let Some(session) = sessions.get_mut(id) else {
            tracing::debug!(session_id = %id, "Bounds change for unknown session ignored");
            return Ok(false);
        };

        session.update_location(update)
    }

    /// Current box of a session
    pub async fn current_box(&self, id: &SessionId) -> Option<BoundingBox> {
        self.sessions.read().await.get(id).map(ClientSession::current_box)
    }

    /// Whether a session exists
    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ids of all live sessions
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Close every session
    pub async fn shutdown(&self) {
        let drained: Vec<ClientSession> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, s)| s).collect()
        };

        let count = drained.len();
        for session in drained {
            session.shutdown().await;
        }

        tracing::info!(sessions = count, "All sessions closed");
    }

    /// Snapshot of routing statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.broker.stats().snapshot()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::delivery::{ChannelDelivery, ClientEvent};
    use crate::geo::LatLng;

    fn sf() -> BoundingBox {
        BoundingBox::new(-122.75, 36.8, -121.75, 37.8).unwrap()
    }

    fn registry() -> (SessionRegistry, Arc<ChannelDelivery>) {
        let broker = Arc::new(RoutingBroker::new());
        let config = SessionConfig::default();
        broker.declare_exchange(&config.exchange);
        let delivery = Arc::new(ChannelDelivery::default());
        let registry = SessionRegistry::new(broker, delivery.clone(), config).unwrap();
        (registry, delivery)
    }

    #[test]
    fn test_new_requires_exchange() {
        let broker = Arc::new(RoutingBroker::new());
        let result = SessionRegistry::new(
            broker,
            Arc::new(ChannelDelivery::default()),
            SessionConfig::default(),
        );
        assert!(matches!(
            result,
            Err(SessionError::Broker(crate::broker::BrokerError::BrokerUnavailable(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent() {
        let (registry, _delivery) = registry();
        let id = SessionId::new("a");

        let first = registry.on_connect(&id).await.unwrap();
        assert_eq!(first.to_feed_filter(), [-74.0, 40.0, -73.0, 41.0]);

        registry
            .on_bounds_changed(&id, LocationUpdate::Bounds(sf()))
            .await
            .unwrap();
        let second = registry.on_connect(&id).await.unwrap();
        assert_eq!(second, sf());

        assert_eq!(registry.session_count().await, 1);
        assert_eq!(registry.broker().queue_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_removes_and_reclaims() {
        let (registry, _delivery) = registry();
        let id = SessionId::new("a");
        registry.on_connect(&id).await.unwrap();

        assert!(registry.on_disconnect(&id).await);
        assert!(!registry.on_disconnect(&id).await);
        assert!(!registry.contains(&id).await);
        assert_eq!(registry.broker().queue_count(), 0);
        assert_eq!(
            registry.broker().binding_count("events_exchange", &id.routing_key()),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounds_change_unknown_session_ignored() {
        let (registry, _delivery) = registry();
        let changed = registry
            .on_bounds_changed(&SessionId::new("ghost"), LocationUpdate::Bounds(sf()))
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_center_update() {
        let (registry, _delivery) = registry();
        let id = SessionId::new("a");
        registry.on_connect(&id).await.unwrap();

        registry
            .on_bounds_changed(&id, LocationUpdate::Center(LatLng::new(37.25, -122.25)))
            .await
            .unwrap();
        assert_eq!(
            registry.current_box(&id).await.unwrap().to_feed_filter(),
            [-122.75, 36.75, -121.75, 37.75]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_isolated() {
        let (registry, delivery) = registry();
        let a = SessionId::new("a");
        let b = SessionId::new("b");
        let mut rx_a = delivery.attach(&a);
        let mut rx_b = delivery.attach(&b);

        registry.on_connect(&a).await.unwrap();
        registry.on_connect(&b).await.unwrap();
        registry
            .on_bounds_changed(&b, LocationUpdate::Bounds(sf()))
            .await
            .unwrap();

        // Let both producers run for a few cycles
        tokio::time::sleep(Duration::from_secs(60)).await;

        let nyc = SessionConfig::default().default_box;
        let mut seen_a = 0;
        while let Ok(ClientEvent::NewEvent(e)) = rx_a.try_recv() {
            assert!(nyc.contains(e.lat, e.lng));
            seen_a += 1;
        }
        let mut seen_b = 0;
        while let Ok(event) = rx_b.try_recv() {
            if let ClientEvent::NewEvent(e) = event {
                // b's very first event may predate its update
                if seen_b > 0 {
                    assert!(sf().contains(e.lat, e.lng));
                }
                seen_b += 1;
            }
        }
        assert!(seen_a >= 4);
        assert!(seen_b >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_all() {
        let (registry, _delivery) = registry();
        for id in ["a", "b", "c"] {
            registry.on_connect(&SessionId::new(id)).await.unwrap();
        }
        assert_eq!(registry.stats().active_sessions, 3);

        registry.shutdown().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let snap = registry.stats();
        assert_eq!(registry.session_count().await, 0);
        assert_eq!(snap.active_sessions, 0);
        assert_eq!(snap.active_producers, 0);
        assert_eq!(registry.broker().queue_count(), 0);
    }
}
