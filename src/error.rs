//! Error types
//!
//! Each layer has its own error enum; [`Error`] folds them together for
//! callers that drive the whole stack (the gateway server and the binary).

use std::io;

use thiserror::Error;

pub use crate::broker::BrokerError;
pub use crate::geo::GeoError;
pub use crate::producer::ProducerError;
pub use crate::session::SessionError;

/// Result alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure (bind, accept, socket writes)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Broker topology or routing failure
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Invalid geographic input
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Producer failure
    #[error(transparent)]
    Producer(#[from] ProducerError),

    /// Session lifecycle failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// JSON encoding or decoding failure on the wire
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means the broker cannot route at all
    pub fn is_broker_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Broker(BrokerError::BrokerUnavailable(_))
                | Error::Session(SessionError::Broker(BrokerError::BrokerUnavailable(_)))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_unavailable_detection() {
        let err: Error = BrokerError::BrokerUnavailable("events".into()).into();
        assert!(err.is_broker_unavailable());

        let err: Error = SessionError::Broker(BrokerError::BrokerUnavailable("x".into())).into();
        assert!(err.is_broker_unavailable());

        let err: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(!err.is_broker_unavailable());
    }

    #[test]
    fn test_display_is_transparent() {
        let err: Error = BrokerError::BrokerUnavailable("events_exchange".into()).into();
        assert_eq!(
            err.to_string(),
            "broker unavailable: exchange 'events_exchange' does not exist"
        );
    }
}
