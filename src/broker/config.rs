//! Broker configuration

/// Default name of the event exchange
pub const DEFAULT_EXCHANGE: &str = "events_exchange";

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Maximum messages held per queue before the oldest is discarded
    pub queue_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

impl BrokerConfig {
    /// Set the per-queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.queue_capacity, 1024);
    }

    #[test]
    fn test_queue_capacity_at_least_one() {
        let config = BrokerConfig::default().queue_capacity(0);
        assert_eq!(config.queue_capacity, 1);
    }
}
