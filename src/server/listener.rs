//! Gateway server listener
//!
//! Handles the TCP accept loop and spawns connection handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::broker::RoutingBroker;
use crate::delivery::ChannelDelivery;
use crate::error::Result;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::session::{SessionId, SessionRegistry};

/// Geofenced event gateway
pub struct GeoServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    delivery: Arc<ChannelDelivery>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl GeoServer {
    /// Create a server with its own broker
    ///
    /// Declares the event exchange before anything else.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let broker = Arc::new(RoutingBroker::with_config(config.broker.clone()));
        broker.declare_exchange(&config.session.exchange);
        Self::with_broker(config, broker)
    }

    /// Create a server on an existing broker
    ///
    /// Fails with `BrokerUnavailable` if the broker lacks the event exchange.
    pub fn with_broker(config: ServerConfig, broker: Arc<RoutingBroker>) -> Result<Self> {
        let delivery = Arc::new(ChannelDelivery::new(config.outbound_capacity));
        let registry = SessionRegistry::new(broker, delivery.clone(), config.session.clone())?;

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            config,
            registry: Arc::new(registry),
            delivery,
            connection_semaphore,
        })
    }

    /// Get a reference to the session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails to bind.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener until `shutdown`
    ///
    /// On shutdown every connection task is stopped and awaited, then any
    /// remaining session is closed. When this returns no session exists and
    /// every client socket has been dropped.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            producer = self.config.session.producer.name(),
            "Geo gateway listening"
        );

        let connections = TaskTracker::new();
        let stop = CancellationToken::new();

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop(&listener, &connections, &stop) => {}
        }

        stop.cancel();
        connections.close();
        connections.wait().await;

        self.registry.shutdown().await;
        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener, connections: &TaskTracker, stop: &CancellationToken) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, connections, stop);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        connections: &TaskTracker,
        stop: &CancellationToken,
    ) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = SessionId::generate();

        tracing::debug!(
            session_id = %session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let registry = Arc::clone(&self.registry);
        let delivery = Arc::clone(&self.delivery);
        let max_line_length = self.config.max_line_length;
        let stop = stop.clone();

        connections.spawn(async move {
            let _permit = permit;
            let connection = Connection::new(session_id.clone(), socket, peer_addr, registry, delivery)
                .max_line_length(max_line_length)
                .shutdown_on(stop);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    session_id = %session_id,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(session_id = %session_id, "Connection closed");
        });
    }
}
