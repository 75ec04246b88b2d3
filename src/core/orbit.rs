use crate::core::maths::{poly_fit_columns, poly_val, vandermonde};
use crate::types::{OrbitStateVector, SarError, SarResult, Vector3};
use nalgebra::DMatrix;
use std::ops::Range;
use std::sync::Arc;

/// Number of state vectors used for one local polynomial fit
pub const WINDOW_SIZE: usize = 4;

/// Default degree of the fitting polynomial
pub const DEFAULT_POLY_DEGREE: usize = 3;

/// Interpolated sensor state at one time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionVelocity {
    pub position: Vector3, // meters
    pub velocity: Vector3, // m/s
}

/// Polynomial coefficients fitted over one state vector window
#[derive(Debug, Clone)]
struct PolyFitCache {
    window: Range<usize>,
    /// x/y/z position then x/y/z velocity, lowest order first
    coefficients: [Vec<f64>; 6],
}

/// Orbit interpolator over a shared, immutable set of state vectors.
///
/// Cloning is cheap: the state vectors and per-line samples are reference
/// counted, only the fit cache is copied. Give each worker thread its own
/// clone since evaluation needs `&mut self`.
#[derive(Debug, Clone)]
pub struct Orbit {
    state_vectors: Arc<[OrbitStateVector]>,
    poly_degree: usize,
    first_line_utc: f64,
    sensor_position: Arc<[Vector3]>,
    sensor_velocity: Arc<[Vector3]>,
    cache: Option<PolyFitCache>,
    refits: usize,
}

impl Orbit {
    /// Create an orbit from state vectors ordered by time.
    ///
    /// Vectors whose time does not exceed the last kept one are dropped.
    ///
    /// Times are MJD2000 days; polynomials use `time - first_line_utc` as the
    /// independent variable.
    pub fn new(
        state_vectors: impl Into<Arc<[OrbitStateVector]>>,
        poly_degree: usize,
        first_line_utc: f64,
    ) -> SarResult<Self> {
        let state_vectors = remove_redundant_vectors(state_vectors.into());

        if state_vectors.len() < poly_degree + 1 {
            return Err(SarError::InsufficientStateVectors {
                available: state_vectors.len(),
                required: poly_degree + 1,
            });
        }
        if poly_degree + 1 > WINDOW_SIZE {
            return Err(SarError::InvalidParameter(format!(
                "polynomial degree {} cannot be fitted over a {}-vector window",
                poly_degree, WINDOW_SIZE
            )));
        }
        log::debug!(
            "Orbit with {} state vectors, polynomial degree {}",
            state_vectors.len(), poly_degree
        );

        Ok(Self {
            state_vectors,
            poly_degree,
            first_line_utc,
            sensor_position: Arc::from(Vec::new()),
            sensor_velocity: Arc::from(Vec::new()),
            cache: None,
            refits: 0,
        })
    }

    /// Create an orbit and evaluate the sensor state for every range line up
    /// front, for the line-indexed zero-Doppler solvers.
    pub fn with_line_samples(
        state_vectors: impl Into<Arc<[OrbitStateVector]>>,
        poly_degree: usize,
        first_line_utc: f64,
        line_time_interval: f64,
        image_height: usize,
    ) -> SarResult<Self> {
        let mut orbit = Self::new(state_vectors, poly_degree, first_line_utc)?;

        let mut positions = Vec::with_capacity(image_height);
        let mut velocities = Vec::with_capacity(image_height);
        for line in 0..image_height {
            let time = first_line_utc + line as f64 * line_time_interval;
            let pv = orbit.position_velocity(time);
            positions.push(pv.position);
            velocities.push(pv.velocity);
        }

        log::debug!("Precomputed sensor state for {} range lines", image_height);

        orbit.sensor_position = positions.into();
        orbit.sensor_velocity = velocities.into();
        Ok(orbit)
    }

    /// Sensor position and velocity at `time` (MJD2000 days)
    pub fn position_velocity(&mut self, time: f64) -> PositionVelocity {
        let window = self.find_adjacent_vectors(time);

        // Only the first index is compared; see DESIGN.md
        let cache = match self.cache.take() {
            Some(cache) if cache.window.start == window.start => cache,
            _ => self.fit_window(window),
        };

        let t = time - self.first_line_utc;
        let c = &cache.coefficients;
        let pv = PositionVelocity {
            position: Vector3::new(poly_val(t, &c[0]), poly_val(t, &c[1]), poly_val(t, &c[2])),
            velocity: Vector3::new(poly_val(t, &c[3]), poly_val(t, &c[4]), poly_val(t, &c[5])),
        };

        self.cache = Some(cache);
        pv
    }

    /// Sensor position at `time`
    pub fn position(&mut self, time: f64) -> Vector3 {
        self.position_velocity(time).position
    }

    /// Sensor speed `|v|` in m/s at `time`
    pub fn velocity(&mut self, time: f64) -> f64 {
        self.position_velocity(time).velocity.norm()
    }

    /// Indices of the (up to) four state vectors used to interpolate `time`.
    ///
    /// Intervals between vectors are half open, `[t_i, t_i+1)`. Times before
    /// the first vector use the first four, times at or after the last vector
    /// use the last four.
    pub fn find_adjacent_vectors(&self, time: f64) -> Range<usize> {
        let nv = self.state_vectors.len();
        if nv <= WINDOW_SIZE {
            return 0..nv;
        }

        if time < self.state_vectors[0].time {
            return 0..WINDOW_SIZE;
        }
        if time >= self.state_vectors[nv - 1].time {
            return nv - WINDOW_SIZE..nv;
        }

        // first i with t_i <= time < t_i+1; NaN times fall through to the start
        let mid = self.state_vectors.partition_point(|sv| sv.time <= time).saturating_sub(1);

        if mid == 0 {
            0..WINDOW_SIZE
        } else if mid >= nv - 2 {
            nv - WINDOW_SIZE..nv
        } else {
            mid - 1..mid + 3
        }
    }

    fn fit_window(&mut self, window: Range<usize>) -> PolyFitCache {
        let vectors = &self.state_vectors[window.clone()];
        let times: Vec<f64> = vectors.iter().map(|sv| sv.time - self.first_line_utc).collect();

        let samples = DMatrix::from_fn(vectors.len(), 6, |i, k| {
            let sv = &vectors[i];
            if k < 3 { sv.position[k] } else { sv.velocity[k - 3] }
        });

        let design = vandermonde(&times, self.poly_degree);
        let coefficients: [Vec<f64>; 6] = match poly_fit_columns(&design, &samples) {
            Ok(fit) => std::array::from_fn(|k| fit.column(k).iter().copied().collect()),
            Err(e) => {
                log::warn!("Orbit polynomial fit over vectors {:?} failed: {}", window, e);
                std::array::from_fn(|_| vec![f64::NAN])
            }
        };

        log::debug!("Refitted orbit polynomials over state vectors {:?}", window);
        self.refits += 1;
        PolyFitCache { window, coefficients }
    }

    pub fn state_vectors(&self) -> &[OrbitStateVector] {
        &self.state_vectors
    }

    pub fn poly_degree(&self) -> usize {
        self.poly_degree
    }

    pub fn first_line_utc(&self) -> f64 {
        self.first_line_utc
    }

    /// Per-line sensor positions (empty unless built with [`Orbit::with_line_samples`])
    pub fn sensor_positions(&self) -> &[Vector3] {
        &self.sensor_position
    }

    /// Per-line sensor velocities (empty unless built with [`Orbit::with_line_samples`])
    pub fn sensor_velocities(&self) -> &[Vector3] {
        &self.sensor_velocity
    }

    /// Window of the currently cached fit, if any
    pub fn cached_window(&self) -> Option<Range<usize>> {
        self.cache.as_ref().map(|c| c.window.clone())
    }

    /// Number of polynomial refits performed by this instance
    pub fn refit_count(&self) -> usize {
        self.refits
    }
}

/// Keep only vectors later than the previously kept one; annotation orbit
/// lists repeat vectors at burst boundaries.
fn remove_redundant_vectors(vectors: Arc<[OrbitStateVector]>) -> Arc<[OrbitStateVector]> {
    if vectors.windows(2).all(|w| w[1].time > w[0].time) {
        return vectors;
    }

    let mut kept: Vec<OrbitStateVector> = Vec::with_capacity(vectors.len());
    for sv in vectors.iter() {
        match kept.last() {
            Some(last) if !(sv.time > last.time) => {}
            _ => kept.push(*sv),
        }
    }

    log::warn!(
        "Dropped {} redundant orbit state vectors, {} kept",
        vectors.len() - kept.len(),
        kept.len()
    );
    kept.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::seconds_to_days;
    use approx::assert_abs_diff_eq;

    const T0: f64 = 7307.7;
    const RADIUS: f64 = 7_070_000.0;
    const PERIOD: f64 = 5940.0;

    fn circular_state(seconds: f64) -> OrbitStateVector {
        let w = 2.0 * std::f64::consts::PI / PERIOD;
        let (s, c) = (w * seconds).sin_cos();
        OrbitStateVector::new(
            T0 + seconds_to_days(seconds),
            Vector3::new(RADIUS * c, RADIUS * s, 0.0),
            Vector3::new(-RADIUS * w * s, RADIUS * w * c, 0.0),
        )
    }

    fn circular_orbit(count: usize, spacing_s: f64) -> Vec<OrbitStateVector> {
        (0..count).map(|i| circular_state(i as f64 * spacing_s)).collect()
    }

    #[test]
    fn test_rejects_too_few_vectors() {
        let err = Orbit::new(circular_orbit(3, 10.0), 3, T0).unwrap_err();
        assert!(matches!(err, SarError::InsufficientStateVectors { available: 3, required: 4 }));
    }

    #[test]
    fn test_rejects_degree_larger_than_window() {
        assert!(Orbit::new(circular_orbit(10, 10.0), 4, T0).is_err());
    }

    #[test]
    fn test_drops_redundant_vectors() {
        let svs = circular_orbit(6, 10.0);
        let mut repeated = svs.clone();
        repeated.insert(3, svs[2]);
        repeated.insert(5, svs[1]);

        let mut orbit = Orbit::new(repeated, 3, T0).unwrap();
        assert_eq!(orbit.state_vectors(), &svs[..]);

        let mut reference = Orbit::new(svs.clone(), 3, T0).unwrap();
        let t = svs[2].time + 0.3 * (svs[3].time - svs[2].time);
        assert_eq!(orbit.position_velocity(t), reference.position_velocity(t));
    }

    #[test]
    fn test_too_few_vectors_after_dropping_repeats() {
        let svs = circular_orbit(3, 10.0);
        let repeated = vec![svs[0], svs[1], svs[1], svs[2], svs[0]];
        assert!(matches!(
            Orbit::new(repeated, 3, T0),
            Err(SarError::InsufficientStateVectors { available: 3, required: 4 })
        ));
    }

    #[test]
    fn test_window_selection() {
        let svs = circular_orbit(8, 10.0);
        let orbit = Orbit::new(svs.clone(), 3, T0).unwrap();
        let t = |s: f64| T0 + seconds_to_days(s);

        assert_eq!(orbit.find_adjacent_vectors(t(-5.0)), 0..4);
        assert_eq!(orbit.find_adjacent_vectors(t(0.0)), 0..4);
        assert_eq!(orbit.find_adjacent_vectors(t(15.0)), 0..4);
        assert_eq!(orbit.find_adjacent_vectors(t(35.0)), 2..6);
        assert_eq!(orbit.find_adjacent_vectors(svs[3].time), 2..6);
        assert_eq!(orbit.find_adjacent_vectors(t(55.0)), 4..8);
        assert_eq!(orbit.find_adjacent_vectors(t(65.0)), 4..8);
        assert_eq!(orbit.find_adjacent_vectors(svs[7].time), 4..8);
        assert_eq!(orbit.find_adjacent_vectors(t(500.0)), 4..8);
    }

    #[test]
    fn test_window_with_few_vectors_uses_all() {
        let orbit = Orbit::new(circular_orbit(3, 10.0), 2, T0).unwrap();
        assert_eq!(orbit.find_adjacent_vectors(T0 + seconds_to_days(12.0)), 0..3);
        assert_eq!(orbit.find_adjacent_vectors(T0 - 1.0), 0..3);
    }

    #[test]
    fn test_reproduces_state_vectors() {
        let svs = circular_orbit(10, 10.0);
        let mut orbit = Orbit::new(svs.clone(), 3, T0).unwrap();
        for sv in &svs {
            let pv = orbit.position_velocity(sv.time);
            assert!((pv.position - sv.position).norm() < 1e-3, "position at {}", sv.time);
            assert!((pv.velocity - sv.velocity).norm() < 1e-6, "velocity at {}", sv.time);
        }
    }

    #[test]
    fn test_interpolates_between_vectors() {
        let mut orbit = Orbit::new(circular_orbit(10, 10.0), 3, T0).unwrap();
        for &s in &[12.5, 33.3, 47.0, 71.9] {
            let truth = circular_state(s);
            let pv = orbit.position_velocity(truth.time);
            assert!((pv.position - truth.position).norm() < 0.01, "position error at {} s", s);
            assert!((pv.velocity - truth.velocity).norm() < 1e-4, "velocity error at {} s", s);
        }
    }

    #[test]
    fn test_refits_only_on_window_change() {
        let mut orbit = Orbit::new(circular_orbit(10, 10.0), 3, T0).unwrap();
        let t = |s: f64| T0 + seconds_to_days(s);
        assert_eq!(orbit.refit_count(), 0);

        for i in 0..50 {
            orbit.position_velocity(t(30.0 + i as f64 * 0.1));
        }
        assert_eq!(orbit.refit_count(), 1);
        assert_eq!(orbit.cached_window(), Some(2..6));

        orbit.position_velocity(t(45.0));
        assert_eq!(orbit.refit_count(), 2);
        assert_eq!(orbit.cached_window(), Some(3..7));

        orbit.position_velocity(t(36.0));
        assert_eq!(orbit.refit_count(), 3);
    }

    #[test]
    fn test_speed() {
        let mut orbit = Orbit::new(circular_orbit(6, 10.0), 3, T0).unwrap();
        let expected = RADIUS * 2.0 * std::f64::consts::PI / PERIOD;
        assert_abs_diff_eq!(orbit.velocity(T0 + seconds_to_days(22.0)), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_line_samples_match_direct_evaluation() {
        let svs = circular_orbit(10, 10.0);
        let first = T0 + seconds_to_days(5.0);
        let lti = seconds_to_days(0.5);
        let orbit = Orbit::with_line_samples(svs.clone(), 3, first, lti, 100).unwrap();
        assert_eq!(orbit.sensor_positions().len(), 100);
        assert_eq!(orbit.sensor_velocities().len(), 100);

        let mut direct = Orbit::new(svs, 3, first).unwrap();
        for line in [0usize, 37, 99] {
            let pv = direct.position_velocity(first + line as f64 * lti);
            assert_eq!(orbit.sensor_positions()[line], pv.position);
            assert_eq!(orbit.sensor_velocities()[line], pv.velocity);
        }
    }

    #[test]
    fn test_clones_share_state_vectors() {
        let orbit = Orbit::new(circular_orbit(6, 10.0), 3, T0).unwrap();
        let mut worker = orbit.clone();
        worker.position_velocity(T0);
        assert!(std::ptr::eq(orbit.state_vectors().as_ptr(), worker.state_vectors().as_ptr()));
        assert_eq!(orbit.refit_count(), 0);
        assert_eq!(worker.refit_count(), 1);
    }
}
