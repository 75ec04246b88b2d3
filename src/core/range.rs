use crate::core::maths::{interpolation_linear, poly_val};
use crate::core::orbit::Orbit;
use crate::types::{
    ProductGeometry, SarError, SarResult, SrgrCoefficients, Vector3, INVALID_RANGE_INDEX,
};

/// Slant range tolerance (m) of the ground range bisection
pub const GROUND_RANGE_TOLERANCE: f64 = 0.1;

const MAX_GROUND_RANGE_ITERATIONS: usize = 200;

/// Distance between the sensor at `time` and `earth_point`, together with the
/// sensor position used
pub fn compute_slant_range(time: f64, orbit: &mut Orbit, earth_point: &Vector3) -> (f64, Vector3) {
    let sensor_position = orbit.position(time);
    ((sensor_position - earth_point).norm(), sensor_position)
}

/// Slant range for a ground range on an SRGR polynomial
#[inline]
pub fn compute_slant_range_from_ground(ground_range: f64, srgr_coefficients: &[f64]) -> f64 {
    poly_val(ground_range, srgr_coefficients)
}

/// Invert an SRGR polynomial by bisection over the swath ground range
/// `[origin, origin + width * spacing]`.
///
/// The polynomial must increase with ground range across the swath. Returns
/// [`INVALID_RANGE_INDEX`] when the slant range lies outside the swath.
pub fn compute_ground_range(
    source_image_width: usize,
    range_spacing: f64,
    slant_range: f64,
    srgr_coefficients: &[f64],
    ground_range_origin: f64,
) -> f64 {
    let mut lower = ground_range_origin;
    if !(slant_range >= poly_val(lower, srgr_coefficients)) {
        return INVALID_RANGE_INDEX;
    }

    let mut upper = ground_range_origin + source_image_width as f64 * range_spacing;
    if !(slant_range <= poly_val(upper, srgr_coefficients)) {
        return INVALID_RANGE_INDEX;
    }

    for _ in 0..MAX_GROUND_RANGE_ITERATIONS {
        let mid = (lower + upper) / 2.0;
        let mid_slant_range = poly_val(mid, srgr_coefficients);

        if (mid_slant_range - slant_range).abs() < GROUND_RANGE_TOLERANCE {
            return mid;
        }
        if mid_slant_range < slant_range {
            lower = mid;
        } else {
            upper = mid;
        }
    }

    log::warn!(
        "Ground range search for slant range {:.3} m did not converge in [{:.3}, {:.3}]",
        slant_range, lower, upper
    );
    INVALID_RANGE_INDEX
}

/// Fractional azimuth (line) index of a zero-Doppler time
#[inline]
pub fn compute_azimuth_index(zero_doppler_time: f64, first_line_utc: f64, line_time_interval: f64) -> f64 {
    (zero_doppler_time - first_line_utc) / line_time_interval
}

/// True when the fractional pixel position falls inside the source image
pub fn is_valid_cell(range_index: f64, azimuth_index: f64, width: usize, height: usize) -> bool {
    (0.0..width as f64).contains(&range_index) && (0.0..height as f64).contains(&azimuth_index)
}

/// Near range is on the left of the image when the incidence angle grows from
/// the first to the last pixel of a line
pub fn is_near_range_on_left(first_pixel_incidence: f64, last_pixel_incidence: f64) -> bool {
    first_pixel_incidence <= last_pixel_incidence
}

/// Converts (zero-Doppler time, slant range) pairs into fractional range
/// pixel indices for slant range or ground range products.
#[derive(Debug, Clone)]
pub struct RangeGeometry {
    srgr_flag: bool,
    source_image_width: usize,
    first_line_utc: f64,
    last_line_utc: f64,
    range_spacing: f64,
    near_edge_slant_range: f64,
    srgr_coefficients: Vec<SrgrCoefficients>,
}

impl RangeGeometry {
    pub fn new(
        srgr_flag: bool,
        source_image_width: usize,
        first_line_utc: f64,
        last_line_utc: f64,
        range_spacing: f64,
        near_edge_slant_range: f64,
        srgr_coefficients: Vec<SrgrCoefficients>,
    ) -> SarResult<Self> {
        if !(range_spacing > 0.0 && range_spacing.is_finite()) {
            return Err(SarError::InvalidParameter(format!(
                "range spacing must be positive, got {}",
                range_spacing
            )));
        }
        if srgr_flag {
            validate_srgr_coefficients(&srgr_coefficients)?;
        }

        Ok(Self {
            srgr_flag,
            source_image_width,
            first_line_utc,
            last_line_utc,
            range_spacing,
            near_edge_slant_range,
            srgr_coefficients,
        })
    }

    pub fn from_geometry(geometry: &ProductGeometry) -> SarResult<Self> {
        Self::new(
            geometry.srgr_flag,
            geometry.source_image_width,
            geometry.first_line_utc,
            geometry.last_line_utc,
            geometry.range_spacing,
            geometry.near_edge_slant_range,
            geometry.srgr_coefficients.clone(),
        )
    }

    /// True for ground range detected products
    pub fn is_ground_range(&self) -> bool {
        self.srgr_flag
    }

    /// Fractional range index for a point with the given zero-Doppler time
    /// (MJD2000 days) and slant range (m), or [`INVALID_RANGE_INDEX`].
    ///
    /// With several SRGR sets the coefficients are interpolated between the
    /// bracketing pair; times outside the sets extrapolate from the nearest pair.
    pub fn range_index(&self, zero_doppler_time: f64, slant_range: f64) -> f64 {
        if !self.within_scene(zero_doppler_time) {
            return INVALID_RANGE_INDEX;
        }
        if !self.srgr_flag {
            return (slant_range - self.near_edge_slant_range) / self.range_spacing;
        }

        if let [single] = self.srgr_coefficients.as_slice() {
            return self.ground_range_index(slant_range, &single.coefficients, single.ground_range_origin);
        }

        let (coefficients, origin) = self.interpolated_coefficients(zero_doppler_time);
        self.ground_range_index(slant_range, &coefficients, origin)
    }

    /// As [`range_index`](Self::range_index), but times before the first or
    /// after the last SRGR set use that set as is instead of extrapolating.
    pub fn extended_range_index(&self, zero_doppler_time: f64, slant_range: f64) -> f64 {
        if !self.within_scene(zero_doppler_time) {
            return INVALID_RANGE_INDEX;
        }
        if !self.srgr_flag {
            return (slant_range - self.near_edge_slant_range) / self.range_spacing;
        }

        let (first, last) = match (self.srgr_coefficients.first(), self.srgr_coefficients.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return INVALID_RANGE_INDEX,
        };
        if self.srgr_coefficients.len() == 1 || zero_doppler_time < first.time {
            return self.ground_range_index(slant_range, &first.coefficients, first.ground_range_origin);
        }
        if zero_doppler_time > last.time {
            return self.ground_range_index(slant_range, &last.coefficients, last.ground_range_origin);
        }

        let (coefficients, origin) = self.interpolated_coefficients(zero_doppler_time);
        self.ground_range_index(slant_range, &coefficients, origin)
    }

    fn within_scene(&self, zero_doppler_time: f64) -> bool {
        let start = self.first_line_utc.min(self.last_line_utc);
        let end = self.first_line_utc.max(self.last_line_utc);
        zero_doppler_time >= start && zero_doppler_time <= end
    }

    fn ground_range_index(&self, slant_range: f64, coefficients: &[f64], origin: f64) -> f64 {
        let ground_range = compute_ground_range(
            self.source_image_width,
            self.range_spacing,
            slant_range,
            coefficients,
            origin,
        );
        if ground_range < 0.0 {
            INVALID_RANGE_INDEX
        } else {
            (ground_range - origin) / self.range_spacing
        }
    }

    /// Coefficients interpolated between the last set at or before `time` and
    /// its successor, plus the ground range origin of the earlier set.
    /// Needs at least two sets.
    fn interpolated_coefficients(&self, time: f64) -> (Vec<f64>, f64) {
        let sets = &self.srgr_coefficients;
        let idx = sets
            .partition_point(|s| s.time <= time)
            .saturating_sub(1)
            .min(sets.len() - 2);

        let (s0, s1) = (&sets[idx], &sets[idx + 1]);
        let mu = (time - s0.time) / (s1.time - s0.time);
        let coefficients = s0
            .coefficients
            .iter()
            .zip(&s1.coefficients)
            .map(|(&c0, &c1)| interpolation_linear(c0, c1, mu))
            .collect();

        (coefficients, s0.ground_range_origin)
    }
}

fn validate_srgr_coefficients(sets: &[SrgrCoefficients]) -> SarResult<()> {
    let first = sets.first().ok_or_else(|| {
        SarError::InvalidSrgrCoefficients("ground range product without SRGR coefficients".to_string())
    })?;

    let num_coefficients = first.coefficients.len();
    if num_coefficients == 0 {
        return Err(SarError::InvalidSrgrCoefficients("empty coefficient set".to_string()));
    }
    if let Some(set) = sets.iter().find(|s| s.coefficients.len() != num_coefficients) {
        return Err(SarError::InvalidSrgrCoefficients(format!(
            "coefficient set at MJD {} has {} coefficients, expected {}",
            set.time,
            set.coefficients.len(),
            num_coefficients
        )));
    }
    if let Some(pair) = sets.windows(2).find(|w| !(w[1].time > w[0].time)) {
        return Err(SarError::InvalidSrgrCoefficients(format!(
            "coefficient set times must increase strictly ({} followed by {})",
            pair[0].time, pair[1].time
        )));
    }
    Ok(())
}
