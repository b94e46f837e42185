//! Bounding boxes
//!
//! A [`BoundingBox`] is the geofilter of one client. It is validated once at
//! construction and never mutated; a location change builds a new box.

use serde::{Deserialize, Serialize};

use super::error::GeoError;

/// Half-width in degrees of the square built around a center point
pub const CENTER_HALF_WIDTH: f64 = 0.5;

/// New York City, the box sessions start with unless configured otherwise
pub const NEW_YORK: BoundingBox = BoundingBox {
    sw_lng: -74.0,
    sw_lat: 40.0,
    ne_lng: -73.0,
    ne_lat: 41.0,
};

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl LatLng {
    /// Create a new point
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Corner pair as exchanged with clients: `{sw: {lat, lng}, ne: {lat, lng}}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corners {
    /// South-west corner
    pub sw: LatLng,
    /// North-east corner
    pub ne: LatLng,
}

/// Axis-aligned lat/lng rectangle
///
/// Invariant: `sw_lng < ne_lng` and `sw_lat < ne_lat`, all coordinates finite
/// and within the valid lat/lng ranges. Boxes crossing the antimeridian are
/// not representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Corners", into = "Corners")]
pub struct BoundingBox {
    sw_lng: f64,
    sw_lat: f64,
    ne_lng: f64,
    ne_lat: f64,
}

impl BoundingBox {
    /// Create a box from its south-west and north-east corners
    pub fn new(sw_lng: f64, sw_lat: f64, ne_lng: f64, ne_lat: f64) -> Result<Self, GeoError> {
        for (name, value) in [
            ("sw_lng", sw_lng),
            ("sw_lat", sw_lat),
            ("ne_lng", ne_lng),
            ("ne_lat", ne_lat),
        ] {
            if !value.is_finite() {
                return Err(GeoError::NonFinite { field: name, value });
            }
        }

        for lat in [sw_lat, ne_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(GeoError::LatitudeOutOfRange(lat));
            }
        }
        for lng in [sw_lng, ne_lng] {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(GeoError::LongitudeOutOfRange(lng));
            }
        }

        if sw_lng >= ne_lng {
            return Err(GeoError::InvertedLongitude { sw: sw_lng, ne: ne_lng });
        }
        if sw_lat >= ne_lat {
            return Err(GeoError::InvertedLatitude { sw: sw_lat, ne: ne_lat });
        }

        Ok(Self {
            sw_lng,
            sw_lat,
            ne_lng,
            ne_lat,
        })
    }

    /// Square of half-width [`CENTER_HALF_WIDTH`] degrees around a point
    ///
    /// The center itself must be a valid point. Edges that would pass a pole
    /// or the antimeridian are clamped, so the box shrinks there instead of
    /// wrapping.
    pub fn around(center: LatLng) -> Result<Self, GeoError> {
        let LatLng { lat, lng } = center;
        for (field, value) in [("lat", lat), ("lng", lng)] {
            if !value.is_finite() {
                return Err(GeoError::NonFinite { field, value });
            }
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }

        Self::new(
            (lng - CENTER_HALF_WIDTH).max(-180.0),
            (lat - CENTER_HALF_WIDTH).max(-90.0),
            (lng + CENTER_HALF_WIDTH).min(180.0),
            (lat + CENTER_HALF_WIDTH).min(90.0),
        )
    }

    /// South-west longitude
    pub fn sw_lng(&self) -> f64 {
        self.sw_lng
    }

    /// South-west latitude
    pub fn sw_lat(&self) -> f64 {
        self.sw_lat
    }

    /// North-east longitude
    pub fn ne_lng(&self) -> f64 {
        self.ne_lng
    }

    /// North-east latitude
    pub fn ne_lat(&self) -> f64 {
        self.ne_lat
    }

    /// South-west corner
    pub fn sw(&self) -> LatLng {
        LatLng::new(self.sw_lat, self.sw_lng)
    }

    /// North-east corner
    pub fn ne(&self) -> LatLng {
        LatLng::new(self.ne_lat, self.ne_lng)
    }

    /// Filter array in feed order: `[sw_lng, sw_lat, ne_lng, ne_lat]`
    pub fn to_feed_filter(&self) -> [f64; 4] {
        [self.sw_lng, self.sw_lat, self.ne_lng, self.ne_lat]
    }

    /// Whether the point lies inside the box (edges included)
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.sw_lat..=self.ne_lat).contains(&lat) && (self.sw_lng..=self.ne_lng).contains(&lng)
    }
}

impl TryFrom<Corners> for BoundingBox {
    type Error = GeoError;

    fn try_from(corners: Corners) -> Result<Self, Self::Error> {
        Self::new(corners.sw.lng, corners.sw.lat, corners.ne.lng, corners.ne.lat)
    }
}

impl From<BoundingBox> for Corners {
    fn from(bbox: BoundingBox) -> Self {
        Corners {
            sw: bbox.sw(),
            ne: bbox.ne(),
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.sw_lng, self.sw_lat, self.ne_lng, self.ne_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let bbox = BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap();
        assert_eq!(bbox.sw(), LatLng::new(40.0, -74.0));
        assert_eq!(bbox.ne(), LatLng::new(41.0, -73.0));
        assert_eq!(bbox.to_feed_filter(), [-74.0, 40.0, -73.0, 41.0]);
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert!(matches!(
            BoundingBox::new(-73.0, 40.0, -74.0, 41.0),
            Err(GeoError::InvertedLongitude { .. })
        ));
        assert!(matches!(
            BoundingBox::new(-74.0, 41.0, -73.0, 41.0),
            Err(GeoError::InvertedLatitude { .. })
        ));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(matches!(
            BoundingBox::new(-74.0, -91.0, -73.0, 41.0),
            Err(GeoError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            BoundingBox::new(-181.0, 40.0, -73.0, 41.0),
            Err(GeoError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            BoundingBox::new(f64::NAN, 40.0, -73.0, 41.0),
            Err(GeoError::NonFinite { field: "sw_lng", .. })
        ));
    }

    #[test]
    fn test_around_center() {
        let bbox = BoundingBox::around(LatLng::new(37.25, -122.25)).unwrap();
        assert_eq!(bbox.to_feed_filter(), [-122.75, 36.75, -121.75, 37.75]);

        // Near a pole or the antimeridian the square is clamped
        let polar = BoundingBox::around(LatLng::new(89.75, 0.0)).unwrap();
        assert_eq!(polar.to_feed_filter(), [-0.5, 89.25, 0.5, 90.0]);
        let dateline = BoundingBox::around(LatLng::new(-89.75, 179.75)).unwrap();
        assert_eq!(dateline.to_feed_filter(), [179.25, -90.0, 180.0, -89.25]);

        assert!(matches!(
            BoundingBox::around(LatLng::new(95.0, 0.0)),
            Err(GeoError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            BoundingBox::around(LatLng::new(0.0, f64::INFINITY)),
            Err(GeoError::NonFinite { field: "lng", .. })
        ));
    }

    #[test]
    fn test_new_york_constant_is_valid() {
        assert_eq!(NEW_YORK, BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap());
    }

    #[test]
    fn test_contains_includes_edges() {
        let bbox = BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap();
        assert!(bbox.contains(40.0, -74.0));
        assert!(bbox.contains(40.5, -73.5));
        assert!(!bbox.contains(41.01, -73.5));
        assert!(!bbox.contains(40.5, -72.9));
    }

    #[test]
    fn test_serde_corner_form() {
        let json = r#"{"sw":{"lat":36.8,"lng":-122.75},"ne":{"lat":37.8,"lng":-121.75}}"#;
        let bbox: BoundingBox = serde_json::from_str(json).unwrap();
        assert_eq!(bbox.to_feed_filter(), [-122.75, 36.8, -121.75, 37.8]);

        let back = serde_json::to_value(bbox).unwrap();
        assert_eq!(back["sw"]["lng"], -122.75);
        assert_eq!(back["ne"]["lat"], 37.8);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let json = r#"{"sw":{"lat":41,"lng":-73},"ne":{"lat":40,"lng":-74}}"#;
        assert!(serde_json::from_str::<BoundingBox>(json).is_err());
    }
}
