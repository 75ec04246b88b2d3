//! sargeo: Range-Doppler geocoding for SAR products
//!
//! Maps earth points onto SAR image coordinates: orbit interpolation from
//! state vectors, zero-Doppler time estimation, slant/ground range to pixel
//! conversion and local incidence angles from a DEM.

pub mod types;
pub mod core;
pub mod io;

// Re-export main types and functions for easier access
pub use crate::types::{
    GeoPos, GeoTransform, OrbitStateVector, ProductGeometry, SarError, SarResult, SrgrCoefficients,
    Vector3, INVALID_RANGE_INDEX, NON_VALID_ZERO_DOPPLER_TIME,
};

pub use crate::core::{
    EarthModel, GeocodedGrid, GeocodedPoint, GeocodingConfig, IncidenceAngles, LocalGeometry, Orbit,
    PositionVelocity, RangeGeometry, SarGeocoder, ZeroDopplerMethod,
};

pub use crate::io::{ElevationModel, GriddedDem, PixelGeoreference};
