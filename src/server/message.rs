//! Inbound client messages
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"submit_bounds","sw":{"lat":36.8,"lng":-122.75},"ne":{"lat":37.8,"lng":-121.75}}
//! {"type":"submit_center","lat":37.3,"lng":-122.25}
//! ```

use serde::Deserialize;

use crate::geo::{BoundingBox, Corners, GeoError, LatLng};
use crate::session::LocationUpdate;

/// A message sent by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The client's map now shows this box
    SubmitBounds {
        /// South-west corner
        sw: LatLng,
        /// North-east corner
        ne: LatLng,
    },
    /// The client moved to this point
    SubmitCenter {
        /// Latitude
        lat: f64,
        /// Longitude
        lng: f64,
    },
}

impl ClientMessage {
    /// Parse one raw line; invalid UTF-8 is a parse error
    pub fn parse(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }

    /// Convert into a location update, validating explicit boxes
    pub fn into_update(self) -> Result<LocationUpdate, GeoError> {
        match self {
            ClientMessage::SubmitBounds { sw, ne } => {
                BoundingBox::try_from(Corners { sw, ne }).map(LocationUpdate::Bounds)
            }
            ClientMessage::SubmitCenter { lat, lng } => {
                Ok(LocationUpdate::Center(LatLng::new(lat, lng)))
            }
        }
    }
}
