//! Server configuration

use std::net::SocketAddr;

use crate::broker::BrokerConfig;
use crate::session::SessionConfig;

/// Longest client line accepted by default, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Events buffered per connection before new ones are dropped
    pub outbound_capacity: usize,

    /// Longest client line, newline excluded; longer lines close the connection
    pub max_line_length: usize,

    /// Broker settings
    pub broker: BrokerConfig,

    /// Settings for every session
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".parse().unwrap(),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            outbound_capacity: 256,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            broker: BrokerConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound buffer
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the longest accepted client line
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max.max(1);
        self
    }

    /// Set broker settings
    pub fn broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }

    /// Set session settings
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.max_line_length, 16 * 1024);
        assert_eq!(config.session.exchange, "events_exchange");
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 5001);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .outbound_capacity(0)
            .broker(BrokerConfig::default().queue_capacity(16))
            .session(SessionConfig::default().poll_backoff(Duration::from_millis(100)));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.outbound_capacity, 1);
        assert_eq!(config.broker.queue_capacity, 16);
        assert_eq!(config.session.poll_backoff, Duration::from_millis(100));
    }
}
