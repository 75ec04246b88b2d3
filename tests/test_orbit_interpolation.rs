mod common;

use approx::assert_abs_diff_eq;
use chrono::{Duration, TimeZone, Utc};
use common::{init_logging, sensor_state, state_vectors, T0};
use sargeo::core::time::{mjd_to_utc, seconds_to_days};
use sargeo::{Orbit, OrbitStateVector};

#[test]
fn test_state_vectors_from_annotation_timestamps() {
    init_logging();

    let start = Utc.with_ymd_and_hms(2020, 1, 3, 12, 0, 0).unwrap();
    let vectors: Vec<OrbitStateVector> = (-3..=5)
        .map(|i| {
            let (p, v) = sensor_state(10.0 * i as f64);
            OrbitStateVector::from_utc(
                start + Duration::seconds(10 * i),
                [p.x, p.y, p.z],
                [v.x, v.y, v.z],
            )
        })
        .collect();

    for (parsed, reference) in vectors.iter().zip(state_vectors()) {
        assert_abs_diff_eq!(parsed.time, reference.time, epsilon = 1e-11);
    }
    assert_eq!(mjd_to_utc(T0).unwrap(), start);

    let mut orbit = Orbit::new(vectors, 3, T0).unwrap();
    let (expected, _) = sensor_state(4.2);
    let position = orbit.position(T0 + seconds_to_days(4.2));
    assert_abs_diff_eq!((position - expected).norm(), 0.0, epsilon = 0.1);
}

#[test]
fn test_interpolation_follows_circular_orbit() {
    init_logging();
    let mut orbit = Orbit::new(state_vectors(), 3, T0).unwrap();

    let mut worst_position = 0.0f64;
    let mut worst_velocity = 0.0f64;
    let mut s = -25.0;
    while s <= 45.0 {
        let pv = orbit.position_velocity(T0 + seconds_to_days(s));
        let (position, velocity) = sensor_state(s);
        worst_position = worst_position.max((pv.position - position).norm());
        worst_velocity = worst_velocity.max((pv.velocity - velocity).norm());
        s += 0.37;
    }

    println!("worst position error {:.4} m, velocity error {:.6} m/s", worst_position, worst_velocity);
    assert!(worst_position < 0.1);
    assert!(worst_velocity < 1e-3);

    let speed = orbit.velocity(T0 + seconds_to_days(7.0));
    assert_abs_diff_eq!(speed, sensor_state(0.0).1.norm(), epsilon = 1e-3);
}

#[test]
fn test_sequential_sweep_refits_once_per_window() {
    init_logging();
    let mut orbit = Orbit::new(state_vectors(), 3, T0).unwrap();

    // 10 s vector spacing: [0, 10), [10, 20) and 20 s use three windows
    for line in 0..=2000 {
        orbit.position_velocity(T0 + seconds_to_days(line as f64 * 0.01));
    }
    assert_eq!(orbit.refit_count(), 3);
    assert_eq!(orbit.cached_window(), Some(4..8));

    // going back to an earlier window refits again
    orbit.position(T0);
    assert_eq!(orbit.refit_count(), 4);
    assert_eq!(orbit.cached_window(), Some(2..6));
}

#[test]
fn test_clones_keep_independent_caches() {
    init_logging();
    let mut orbit = Orbit::with_line_samples(state_vectors(), 3, T0, seconds_to_days(0.01), 2001).unwrap();
    let warm = orbit.refit_count();

    let mut worker = orbit.clone();
    worker.position(T0 - seconds_to_days(28.0));
    assert_eq!(worker.cached_window(), Some(0..4));
    assert_ne!(orbit.cached_window(), Some(0..4));
    assert_eq!(orbit.refit_count(), warm);

    assert_eq!(worker.sensor_positions().len(), 2001);
    assert_eq!(worker.sensor_positions()[1000], orbit.sensor_positions()[1000]);
    let (expected, _) = sensor_state(10.0);
    assert_abs_diff_eq!((orbit.sensor_positions()[1000] - expected).norm(), 0.0, epsilon = 0.1);
}
