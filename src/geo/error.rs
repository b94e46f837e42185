//! Geographic validation errors

use thiserror::Error;

/// Error building a bounding box or event from raw coordinates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// A coordinate is NaN or infinite
    #[error("coordinate {field} is not finite: {value}")]
    NonFinite {
        /// Offending field name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Latitude outside [-90, 90]
    #[error("latitude {0} is out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180]
    #[error("longitude {0} is out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// South-west longitude is not strictly west of north-east longitude
    #[error("south-west longitude {sw} must be less than north-east longitude {ne}")]
    InvertedLongitude {
        /// South-west longitude
        sw: f64,
        /// North-east longitude
        ne: f64,
    },

    /// South-west latitude is not strictly south of north-east latitude
    #[error("south-west latitude {sw} must be less than north-east latitude {ne}")]
    InvertedLatitude {
        /// South-west latitude
        sw: f64,
        /// North-east latitude
        ne: f64,
    },
}
