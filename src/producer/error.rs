//! Producer error types

use std::io;

use thiserror::Error;

use crate::broker::BrokerError;

/// Terminal failure of one producer instance
///
/// Producers never retry: any of these ends the producer, leaving the
/// session's stream empty until its next location update.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Could not connect to the live feed
    #[error("failed to connect to feed {addr}: {source}")]
    Connect {
        /// Feed address
        addr: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Transport error while talking to the feed
    #[error("feed transport error: {0}")]
    Feed(#[from] io::Error),

    /// The feed closed the connection
    #[error("feed closed the connection")]
    FeedClosed,

    /// Publishing into the broker failed
    #[error("publish failed: {0}")]
    Broker(#[from] BrokerError),
}
