//! Broker error types

use thiserror::Error;

use super::key::QueueId;

/// Error type for broker operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The named exchange does not exist
    #[error("broker unavailable: exchange '{0}' does not exist")]
    BrokerUnavailable(String),

    /// The queue was never created or has been reclaimed
    #[error("queue not found: {0}")]
    QueueNotFound(QueueId),

    /// A message body could not be encoded
    #[error("failed to encode message: {0}")]
    Encode(String),
}
