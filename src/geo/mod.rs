//! Geographic primitives
//!
//! - [`BoundingBox`]: a client's rectangular geofilter
//! - [`GeoEvent`]: one geotagged event flowing from producers to clients

pub mod bbox;
pub mod error;
pub mod event;

pub use bbox::{BoundingBox, Corners, LatLng, CENTER_HALF_WIDTH, NEW_YORK};
pub use error::GeoError;
pub use event::GeoEvent;
