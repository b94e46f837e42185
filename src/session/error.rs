//! Session error types

use thiserror::Error;

use crate::broker::BrokerError;
use crate::geo::GeoError;

use super::state::SessionPhase;

/// Error type for session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Operation not allowed in the current phase
    #[error("session is {actual:?}, expected {expected:?}")]
    InvalidPhase {
        /// Phase the operation requires
        expected: SessionPhase,
        /// Phase the session is in
        actual: SessionPhase,
    },

    /// Broker refused the queue setup
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// New location is not a valid box
    #[error(transparent)]
    Geo(#[from] GeoError),
}
