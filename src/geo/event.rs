//! Geotagged events
//!
//! Events travel through the broker as JSON bodies held in `bytes::Bytes`,
//! so fan-in from producers and hand-off to consumers never copy the payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single geotagged event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEvent {
    /// Free-form payload
    pub text: String,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl GeoEvent {
    /// Create a new event
    pub fn new(text: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            text: text.into(),
            lat,
            lng,
        }
    }

    /// Encode as a broker message body
    pub fn to_body(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// Decode from a broker message body
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_wire_shape() {
        let event = GeoEvent::new("Event 7: 1700000000", 40.5, -73.5);
        let body = event.to_body().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["text"], "Event 7: 1700000000");
        assert_eq!(value["lat"], 40.5);
        assert_eq!(value["lng"], -73.5);

        assert_eq!(GeoEvent::from_body(&body).unwrap(), event);
    }

    #[test]
    fn test_from_body_rejects_garbage() {
        assert!(GeoEvent::from_body(b"not json").is_err());
        assert!(GeoEvent::from_body(br#"{"text":"x","lat":1.0}"#).is_err());
    }
}
