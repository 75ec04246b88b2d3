use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::time::utc_to_mjd;

/// Cartesian 3-vector in the Earth-Centered, Earth-Fixed frame (meters or m/s)
pub type Vector3 = nalgebra::Vector3<f64>;

/// Returned by the zero-Doppler solvers when the earth point is not imaged
pub const NON_VALID_ZERO_DOPPLER_TIME: f64 = -99999.0;

/// Returned by the range converters when the point falls outside the swath
pub const INVALID_RANGE_INDEX: f64 = -1.0;

/// Orbit state vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitStateVector {
    pub time: f64,          // MJD2000, days
    pub position: Vector3,  // [x, y, z] in meters
    pub velocity: Vector3,  // [vx, vy, vz] in m/s
}

impl OrbitStateVector {
    pub fn new(time: f64, position: Vector3, velocity: Vector3) -> Self {
        Self { time, position, velocity }
    }

    /// Build a state vector from an annotation timestamp
    pub fn from_utc(time: DateTime<Utc>, position: [f64; 3], velocity: [f64; 3]) -> Self {
        Self {
            time: utc_to_mjd(time),
            position: Vector3::from(position),
            velocity: Vector3::from(velocity),
        }
    }
}

/// Slant-range to ground-range conversion polynomial valid at one azimuth time.
///
/// The polynomial gives slant range as `c0 + c1*g + c2*g^2 + ...` where `g` is
/// the ground range in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrgrCoefficients {
    pub time: f64,                // MJD2000, days
    pub ground_range_origin: f64, // meters
    pub coefficients: Vec<f64>,
}

/// Geodetic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPos {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPos {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Geospatial transformation parameters (GDAL convention, pixel corner based)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build from the six GDAL coefficients
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }
}

/// Geometry annotations of a SAR product needed for geocoding.
///
/// Times are MJD2000 days; `line_time_interval` is in days per line as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGeometry {
    /// Radar wavelength in meters
    pub wavelength: f64,
    /// Zero-Doppler time of the first range line
    pub first_line_utc: f64,
    /// Zero-Doppler time of the last range line
    pub last_line_utc: f64,
    pub line_time_interval: f64,
    /// Range pixel spacing in meters (ground or slant depending on `srgr_flag`)
    pub range_spacing: f64,
    pub azimuth_spacing: f64,
    /// True for ground-range detected products
    pub srgr_flag: bool,
    pub srgr_coefficients: Vec<SrgrCoefficients>,
    pub near_edge_slant_range: f64,
    pub source_image_width: usize,
    pub source_image_height: usize,
    pub orbit_state_vectors: Vec<OrbitStateVector>,
}

/// Error types for SAR geocoding
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("Not enough orbit state vectors for polynomial fitting: {available} available, {required} required")]
    InsufficientStateVectors { available: usize, required: usize },

    #[error("Invalid SRGR coefficients: {0}")]
    InvalidSrgrCoefficients(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
