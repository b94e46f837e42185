//! Producer configuration

use std::time::Duration;

/// Settings for the simulated generator
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedConfig {
    /// Fixed part of the pause between two events
    pub base_interval: Duration,

    /// Upper bound of the uniform random extra pause
    pub max_jitter: Duration,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(10),
            max_jitter: Duration::from_secs(3),
        }
    }
}

impl SimulatedConfig {
    /// Set the base interval
    pub fn base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Set the maximum jitter
    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Longest possible pause between two events
    pub fn max_interval(&self) -> Duration {
        self.base_interval + self.max_jitter
    }
}

/// Settings for the live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    /// `host:port` of the line-delimited JSON feed
    pub feed_addr: String,
}

impl LiveConfig {
    /// Create a config for a feed address
    pub fn new(feed_addr: impl Into<String>) -> Self {
        Self {
            feed_addr: feed_addr.into(),
        }
    }
}

/// Which producer every new session gets
///
/// Chosen once from configuration; sessions never switch kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerKind {
    /// Internal random generator
    Simulated(SimulatedConfig),
    /// External feed
    Live(LiveConfig),
}

impl Default for ProducerKind {
    fn default() -> Self {
        ProducerKind::Simulated(SimulatedConfig::default())
    }
}

impl ProducerKind {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ProducerKind::Simulated(_) => "simulated",
            ProducerKind::Live(_) => "live",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_simulated() {
        let config = SimulatedConfig::default();
        assert_eq!(config.base_interval, Duration::from_secs(10));
        assert_eq!(config.max_jitter, Duration::from_secs(3));
        assert_eq!(config.max_interval(), Duration::from_secs(13));
    }

    #[test]
    fn test_default_kind_is_simulated() {
        assert_eq!(ProducerKind::default().name(), "simulated");
        assert_eq!(
            ProducerKind::Live(LiveConfig::new("127.0.0.1:9000")).name(),
            "live"
        );
    }
}
