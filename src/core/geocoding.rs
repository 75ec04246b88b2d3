use crate::core::doppler::{
    zero_doppler_time, zero_doppler_time_from_orbit, zero_doppler_time_newton,
    zero_doppler_time_newton_orbit,
};
use crate::core::ellipsoid::{geo_to_xyz, EarthModel};
use crate::core::incidence::{
    compute_local_incidence_angle, compute_local_incidence_angle_with_fallback, LocalGeometry,
};
use crate::core::orbit::{Orbit, DEFAULT_POLY_DEGREE};
use crate::core::range::{compute_azimuth_index, compute_slant_range, is_valid_cell, RangeGeometry};
use crate::io::dem::{GriddedDem, PixelGeoreference};
use crate::types::{ProductGeometry, SarError, SarResult, Vector3, NON_VALID_ZERO_DOPPLER_TIME};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Zero-Doppler solver used by the geocoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroDopplerMethod {
    /// Bisection over precomputed per-line sensor states
    #[default]
    Bisection,
    /// Newton iteration over precomputed per-line sensor states
    Newton,
    /// State vector walk followed by bisection in time
    StateVectors,
    /// Newton iteration in time on the orbit polynomials
    NewtonOrbit,
}

impl ZeroDopplerMethod {
    /// True when the solver works on per-line sensor states
    pub fn uses_line_samples(&self) -> bool {
        matches!(self, ZeroDopplerMethod::Bisection | ZeroDopplerMethod::Newton)
    }
}

/// Geocoding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Degree of the orbit interpolation polynomial
    pub poly_degree: usize,
    pub zero_doppler_method: ZeroDopplerMethod,
    /// Ellipsoid for geodetic earth points
    pub earth_model: EarthModel,
    /// Clamp to the outer SRGR sets instead of extrapolating coefficients
    pub use_extended_range_index: bool,
    /// Iteration limit of the line-indexed Newton solver
    pub max_iterations: usize,
    pub save_local_incidence_angle: bool,
    pub save_projected_local_incidence_angle: bool,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            poly_degree: DEFAULT_POLY_DEGREE,
            zero_doppler_method: ZeroDopplerMethod::default(),
            earth_model: EarthModel::default(),
            use_extended_range_index: false,
            max_iterations: 50,
            save_local_incidence_angle: true,
            save_projected_local_incidence_angle: true,
        }
    }
}

impl GeocodingConfig {
    fn saves_incidence_angles(&self) -> bool {
        self.save_local_incidence_angle || self.save_projected_local_incidence_angle
    }
}

/// SAR image position of one earth point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodedPoint {
    /// Fractional range pixel
    pub range_index: f64,
    /// Fractional azimuth line
    pub azimuth_index: f64,
    /// MJD2000 days
    pub zero_doppler_time: f64,
    /// meters
    pub slant_range: f64,
    pub sensor_position: Vector3,
}

/// Per-cell geocoding of a DEM grid. Cells that are not imaged hold NaN.
#[derive(Debug, Clone)]
pub struct GeocodedGrid {
    pub range_index: Array2<f64>,
    pub azimuth_index: Array2<f64>,
    /// Degrees, present when enabled in the configuration
    pub local_incidence_angle: Option<Array2<f32>>,
    /// Degrees, present when enabled in the configuration
    pub projected_local_incidence_angle: Option<Array2<f32>>,
    /// Number of cells that fall inside the SAR image
    pub valid_count: usize,
}

/// One DEM row worth of results
struct RowResult {
    range_index: Vec<f64>,
    azimuth_index: Vec<f64>,
    local: Vec<f32>,
    projected: Vec<f32>,
    valid_count: usize,
}

/// Range-Doppler geocoder for one SAR product.
///
/// Geocoding needs `&mut self` because the orbit caches its current
/// polynomial fit. Clones share the state vectors and per-line samples, so
/// giving each worker thread its own clone is cheap.
#[derive(Debug, Clone)]
pub struct SarGeocoder {
    config: GeocodingConfig,
    wavelength: f64,
    first_line_utc: f64,
    line_time_interval: f64,
    source_image_width: usize,
    source_image_height: usize,
    orbit: Orbit,
    range_geometry: RangeGeometry,
}

impl SarGeocoder {
    pub fn new(geometry: &ProductGeometry, config: GeocodingConfig) -> SarResult<Self> {
        if !(geometry.wavelength > 0.0 && geometry.wavelength.is_finite()) {
            return Err(SarError::InvalidParameter(format!(
                "radar wavelength must be positive, got {}",
                geometry.wavelength
            )));
        }
        if geometry.line_time_interval == 0.0 || !geometry.line_time_interval.is_finite() {
            return Err(SarError::InvalidParameter(format!(
                "line time interval must be finite and non-zero, got {}",
                geometry.line_time_interval
            )));
        }
        if geometry.source_image_width == 0 || geometry.source_image_height == 0 {
            return Err(SarError::InvalidParameter(format!(
                "empty source image {}x{}",
                geometry.source_image_width, geometry.source_image_height
            )));
        }

        let orbit = if config.zero_doppler_method.uses_line_samples() {
            Orbit::with_line_samples(
                geometry.orbit_state_vectors.clone(),
                config.poly_degree,
                geometry.first_line_utc,
                geometry.line_time_interval,
                geometry.source_image_height,
            )?
        } else {
            Orbit::new(
                geometry.orbit_state_vectors.clone(),
                config.poly_degree,
                geometry.first_line_utc,
            )?
        };
        let range_geometry = RangeGeometry::from_geometry(geometry)?;

        log::info!(
            "Geocoder for {}x{} {} range image, {:?} zero-Doppler solver, {}",
            geometry.source_image_width,
            geometry.source_image_height,
            if geometry.srgr_flag { "ground" } else { "slant" },
            config.zero_doppler_method,
            config.earth_model
        );

        Ok(Self {
            config,
            wavelength: geometry.wavelength,
            first_line_utc: geometry.first_line_utc,
            line_time_interval: geometry.line_time_interval,
            source_image_width: geometry.source_image_width,
            source_image_height: geometry.source_image_height,
            orbit,
            range_geometry,
        })
    }

    pub fn config(&self) -> &GeocodingConfig {
        &self.config
    }

    pub fn orbit(&self) -> &Orbit {
        &self.orbit
    }

    pub fn range_geometry(&self) -> &RangeGeometry {
        &self.range_geometry
    }

    /// Zero-Doppler time of `earth_point` with the configured solver
    pub fn zero_doppler_time(&mut self, earth_point: &Vector3) -> f64 {
        match self.config.zero_doppler_method {
            ZeroDopplerMethod::Bisection => zero_doppler_time(
                self.first_line_utc,
                self.line_time_interval,
                self.wavelength,
                earth_point,
                self.orbit.sensor_positions(),
                self.orbit.sensor_velocities(),
            ),
            ZeroDopplerMethod::Newton => zero_doppler_time_newton(
                self.first_line_utc,
                self.line_time_interval,
                self.wavelength,
                earth_point,
                self.orbit.sensor_positions(),
                self.orbit.sensor_velocities(),
                self.config.max_iterations,
            ),
            ZeroDopplerMethod::StateVectors => zero_doppler_time_from_orbit(
                self.line_time_interval,
                self.wavelength,
                earth_point,
                &mut self.orbit,
            ),
            ZeroDopplerMethod::NewtonOrbit => zero_doppler_time_newton_orbit(
                self.line_time_interval,
                self.wavelength,
                earth_point,
                &mut self.orbit,
            ),
        }
    }

    /// Image position of an ECEF earth point, `None` when it is not imaged
    pub fn geocode(&mut self, earth_point: &Vector3) -> Option<GeocodedPoint> {
        let zero_doppler_time = self.zero_doppler_time(earth_point);
        if zero_doppler_time == NON_VALID_ZERO_DOPPLER_TIME {
            return None;
        }

        let (slant_range, sensor_position) =
            compute_slant_range(zero_doppler_time, &mut self.orbit, earth_point);

        let range_index = if self.config.use_extended_range_index {
            self.range_geometry.extended_range_index(zero_doppler_time, slant_range)
        } else {
            self.range_geometry.range_index(zero_doppler_time, slant_range)
        };
        let azimuth_index =
            compute_azimuth_index(zero_doppler_time, self.first_line_utc, self.line_time_interval);

        if !is_valid_cell(range_index, azimuth_index, self.source_image_width, self.source_image_height) {
            return None;
        }

        Some(GeocodedPoint {
            range_index,
            azimuth_index,
            zero_doppler_time,
            slant_range,
            sensor_position,
        })
    }

    /// Image position of a geodetic point (degrees, ellipsoid height in m)
    pub fn geocode_geodetic(&mut self, lat: f64, lon: f64, height: f64) -> Option<GeocodedPoint> {
        let earth_point = geo_to_xyz(lat, lon, height, self.config.earth_model);
        self.geocode(&earth_point)
    }

    /// Geocode every cell of a DEM grid, rows in parallel.
    pub fn geocode_dem(&self, dem: &GriddedDem) -> GeocodedGrid {
        let (height, width) = dem.dim();
        log::info!("Geocoding {}x{} DEM grid", width, height);

        #[cfg(feature = "parallel")]
        let rows: Vec<RowResult> = {
            use rayon::prelude::*;
            (0..height)
                .into_par_iter()
                .map_init(|| self.clone(), |geocoder, row| geocoder.geocode_dem_row(dem, row))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let rows: Vec<RowResult> = {
            let mut geocoder = self.clone();
            (0..height).map(|row| geocoder.geocode_dem_row(dem, row)).collect()
        };

        let mut grid = GeocodedGrid {
            range_index: Array2::from_elem((height, width), f64::NAN),
            azimuth_index: Array2::from_elem((height, width), f64::NAN),
            local_incidence_angle: self
                .config
                .save_local_incidence_angle
                .then(|| Array2::from_elem((height, width), f32::NAN)),
            projected_local_incidence_angle: self
                .config
                .save_projected_local_incidence_angle
                .then(|| Array2::from_elem((height, width), f32::NAN)),
            valid_count: 0,
        };

        for (i, row) in rows.into_iter().enumerate() {
            grid.range_index.row_mut(i).assign(&ArrayView1::from(&row.range_index));
            grid.azimuth_index.row_mut(i).assign(&ArrayView1::from(&row.azimuth_index));
            if let Some(local) = grid.local_incidence_angle.as_mut() {
                local.row_mut(i).assign(&ArrayView1::from(&row.local));
            }
            if let Some(projected) = grid.projected_local_incidence_angle.as_mut() {
                projected.row_mut(i).assign(&ArrayView1::from(&row.projected));
            }
            grid.valid_count += row.valid_count;
        }

        let total = (width * height).max(1);
        log::info!(
            "Geocoding completed: {} of {} cells imaged ({:.1}%)",
            grid.valid_count,
            width * height,
            grid.valid_count as f64 / total as f64 * 100.0
        );

        grid
    }

    fn geocode_dem_row(&mut self, dem: &GriddedDem, row: usize) -> RowResult {
        let (height, width) = dem.dim();
        let mut result = RowResult {
            range_index: vec![f64::NAN; width],
            azimuth_index: vec![f64::NAN; width],
            local: vec![f32::NAN; width],
            projected: vec![f32::NAN; width],
            valid_count: 0,
        };

        for col in 0..width {
            let Some(elevation) = dem.height_at(row, col) else {
                continue;
            };
            let pos = dem.geo_pos(col as f64, row as f64);
            let earth_point = geo_to_xyz(pos.lat, pos.lon, elevation, self.config.earth_model);

            let Some(point) = self.geocode(&earth_point) else {
                continue;
            };
            result.range_index[col] = point.range_index;
            result.azimuth_index[col] = point.azimuth_index;
            result.valid_count += 1;

            if !self.config.saves_incidence_angles() {
                continue;
            }

            let lg = LocalGeometry::from_grid(dem, row, col, earth_point, point.sensor_position)
                .with_earth_model(self.config.earth_model);
            let interior = row > 0 && col > 0 && row + 1 < height && col + 1 < width;
            let angles = if interior {
                compute_local_incidence_angle(&lg, dem.data().view(), row, col, dem.no_data())
            } else {
                compute_local_incidence_angle_with_fallback(
                    &lg,
                    dem.data().view(),
                    row,
                    col,
                    dem.no_data(),
                    dem,
                    dem,
                )
            };

            if let Some(angles) = angles {
                result.local[col] = angles.local as f32;
                result.projected[col] = angles.projected as f32;
            }
        }

        result
    }
}
