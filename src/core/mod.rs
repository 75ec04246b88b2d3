//! Core geocoding modules

pub mod maths;
pub mod time;
pub mod ellipsoid;
pub mod orbit;
pub mod doppler;
pub mod range;
pub mod incidence;
pub mod geocoding;

// Re-export main types
pub use ellipsoid::EarthModel;
pub use orbit::{Orbit, PositionVelocity};
pub use range::RangeGeometry;
pub use incidence::{IncidenceAngles, LocalGeometry};
pub use geocoding::{GeocodedGrid, GeocodedPoint, GeocodingConfig, SarGeocoder, ZeroDopplerMethod};
