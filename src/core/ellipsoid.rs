use crate::types::{GeoPos, Vector3};
use serde::{Deserialize, Serialize};

/// Reference ellipsoid used for geodetic <-> ECEF conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EarthModel {
    #[default]
    Wgs84,
    Grs80,
}

impl EarthModel {
    /// Semi-major axis in meters
    pub fn semi_major_axis(&self) -> f64 {
        match self {
            EarthModel::Wgs84 | EarthModel::Grs80 => 6_378_137.0,
        }
    }

    pub fn flattening(&self) -> f64 {
        match self {
            EarthModel::Wgs84 => 1.0 / 298.257_223_563,
            EarthModel::Grs80 => 1.0 / 298.257_222_101,
        }
    }

    /// Semi-minor axis in meters
    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis() * (1.0 - self.flattening())
    }

    /// First eccentricity squared
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }
}

impl std::fmt::Display for EarthModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EarthModel::Wgs84 => write!(f, "WGS84"),
            EarthModel::Grs80 => write!(f, "GRS80"),
        }
    }
}

/// Convert geodetic latitude/longitude (degrees) and ellipsoid height (m) to ECEF
pub fn geo_to_xyz(lat: f64, lon: f64, height: f64, model: EarthModel) -> Vector3 {
    let a = model.semi_major_axis();
    let e2 = model.eccentricity_squared();

    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - e2) + height) * sin_lat,
    )
}

/// [`geo_to_xyz`] on WGS84
#[inline]
pub fn geo_to_xyz_wgs84(lat: f64, lon: f64, height: f64) -> Vector3 {
    geo_to_xyz(lat, lon, height, EarthModel::Wgs84)
}

/// Convert ECEF to geodetic position (degrees) and ellipsoid height (m).
///
/// Uses Bowring's parametric latitude iteration; a few passes reach
/// sub-millimeter accuracy for points between the earth surface and orbit.
pub fn xyz_to_geo(xyz: &Vector3, model: EarthModel) -> (GeoPos, f64) {
    let a = model.semi_major_axis();
    let b = model.semi_minor_axis();
    let f = model.flattening();
    let e2 = model.eccentricity_squared();
    let ep2 = (a * a - b * b) / (b * b);

    let p = (xyz.x * xyz.x + xyz.y * xyz.y).sqrt();
    let lon = xyz.y.atan2(xyz.x);

    let mut beta = (xyz.z * a).atan2(p * b);
    let mut lat = 0.0;
    for _ in 0..4 {
        let (sin_beta, cos_beta) = beta.sin_cos();
        lat = (xyz.z + ep2 * b * sin_beta.powi(3)).atan2(p - e2 * a * cos_beta.powi(3));
        beta = ((1.0 - f) * lat.sin()).atan2(lat.cos());
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let height = p * cos_lat + xyz.z * sin_lat - a * (1.0 - e2 * sin_lat * sin_lat).sqrt();

    (GeoPos::new(lat.to_degrees(), lon.to_degrees()), height)
}

/// Convert a pixel spacing in meters to degrees (along the equator)
pub fn pixel_spacing_in_degree(pixel_spacing_in_meter: f64) -> f64 {
    (pixel_spacing_in_meter / EarthModel::Wgs84.semi_major_axis()).to_degrees()
}

/// Convert a pixel spacing in degrees to meters.
///
/// Uses the semi-minor axis, so it is slightly conservative compared with
/// the inverse of [`pixel_spacing_in_degree`].
pub fn pixel_spacing_in_meter(pixel_spacing_in_degree: f64) -> f64 {
    pixel_spacing_in_degree.to_radians() * EarthModel::Wgs84.semi_minor_axis()
}
