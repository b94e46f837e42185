//! Routing keys and queue identifiers

use std::sync::Arc;

/// Opaque routing key used for exact-match direct routing
///
/// Cheap to clone: the key text is reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey(Arc<str>);

impl RoutingKey {
    /// Create a new routing key
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutingKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RoutingKey {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

/// Broker-allocated queue identifier, never reused within a broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(pub(super) u64);

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "queue.gen-{}", self.0)
    }
}
