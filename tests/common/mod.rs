#![allow(dead_code)]

use sargeo::core::time::seconds_to_days;
use sargeo::{OrbitStateVector, ProductGeometry, SrgrCoefficients, Vector3};

/// 2020-01-03T12:00:00Z
pub const T0: f64 = 7307.5;
pub const RADIUS: f64 = 7_070_000.0;
pub const PERIOD: f64 = 5940.0;
pub const WAVELENGTH: f64 = 0.0555;
pub const LINE_SECONDS: f64 = 0.01;
pub const SCENE_SECONDS: f64 = 20.0;
pub const NEAR_RANGE: f64 = 800_000.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn omega() -> f64 {
    2.0 * std::f64::consts::PI / PERIOD
}

/// Sensor position and velocity `seconds` after T0 on a polar circular
/// orbit in the x-z plane that crosses the equator at T0
pub fn sensor_state(seconds: f64) -> (Vector3, Vector3) {
    let w = omega();
    let (sin, cos) = (w * seconds).sin_cos();
    (
        Vector3::new(RADIUS * cos, 0.0, RADIUS * sin),
        Vector3::new(-RADIUS * w * sin, 0.0, RADIUS * w * cos),
    )
}

/// State vectors every 10 s from 30 s before to 30 s after the scene
pub fn state_vectors() -> Vec<OrbitStateVector> {
    (-3..=5)
        .map(|i| {
            let s = 10.0 * i as f64;
            let (position, velocity) = sensor_state(s);
            OrbitStateVector::new(T0 + seconds_to_days(s), position, velocity)
        })
        .collect()
}

/// Seconds after T0 at which `earth_point` is imaged, and its slant range
pub fn analytic_zero_doppler(earth_point: &Vector3) -> (f64, f64) {
    let seconds = earth_point.z.atan2(earth_point.x) / omega();
    let (sensor, _) = sensor_state(seconds);
    (seconds, (sensor - earth_point).norm())
}

/// Slant range product, 10 m range pixels starting at 800 km
pub fn slant_scene() -> ProductGeometry {
    ProductGeometry {
        wavelength: WAVELENGTH,
        first_line_utc: T0,
        last_line_utc: T0 + seconds_to_days(SCENE_SECONDS),
        line_time_interval: seconds_to_days(LINE_SECONDS),
        range_spacing: 10.0,
        azimuth_spacing: 14.0,
        srgr_flag: false,
        srgr_coefficients: vec![],
        near_edge_slant_range: NEAR_RANGE,
        source_image_width: 10_000,
        source_image_height: (SCENE_SECONDS / LINE_SECONDS) as usize + 1,
        orbit_state_vectors: state_vectors(),
    }
}

pub fn srgr_sets() -> Vec<SrgrCoefficients> {
    vec![
        SrgrCoefficients {
            time: T0 + seconds_to_days(2.0),
            ground_range_origin: 0.0,
            coefficients: vec![NEAR_RANGE, 0.55, 2.5e-7],
        },
        SrgrCoefficients {
            time: T0 + seconds_to_days(18.0),
            ground_range_origin: 0.0,
            coefficients: vec![NEAR_RANGE + 100.0, 0.55, 2.4e-7],
        },
    ]
}

/// Ground range product over the same acquisition
pub fn ground_scene() -> ProductGeometry {
    ProductGeometry {
        srgr_flag: true,
        srgr_coefficients: srgr_sets(),
        source_image_width: 25_000,
        ..slant_scene()
    }
}
