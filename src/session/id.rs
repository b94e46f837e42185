//! Session identifiers

use crate::broker::RoutingKey;

/// Connection-scoped session identifier
///
/// The session's routing key is derived from it, so it must be unique among
/// live sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Routing key this session's queue is bound with
    pub fn routing_key(&self) -> RoutingKey {
        RoutingKey::new(&self.0)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key_matches_id() {
        let id = SessionId::new("8f2c");
        assert_eq!(id.routing_key().as_str(), "8f2c");
    }

    #[test]
    fn test_generate_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
