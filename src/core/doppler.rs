use crate::core::orbit::Orbit;
use crate::types::{Vector3, NON_VALID_ZERO_DOPPLER_TIME};

/// Convergence threshold of the time-domain Newton solver in Hz
pub const NEWTON_FREQUENCY_TOLERANCE: f64 = 0.001;

/// Iteration limit of the time-domain Newton solver
pub const NEWTON_MAX_ITERATIONS: usize = 10;

/// Line distance at which the line-indexed Newton iteration stops
const NEWTON_LINE_STEP: usize = 2;

/// Upper bound on time-domain bisection steps; float resolution of an MJD
/// bracket is exhausted long before this.
const MAX_BISECTION_ITERATIONS: usize = 128;

/// Doppler frequency in Hz of `earth_point` seen from a sensor at
/// `sensor_position` moving with `sensor_velocity`
#[inline]
pub fn doppler_frequency(
    earth_point: &Vector3,
    sensor_position: &Vector3,
    sensor_velocity: &Vector3,
    wavelength: f64,
) -> f64 {
    let diff = earth_point - sensor_position;
    2.0 * sensor_velocity.dot(&diff) / (diff.norm() * wavelength)
}

/// Zero-Doppler time (MJD2000 days) by bisection over range lines.
///
/// `sensor_position[y]`/`sensor_velocity[y]` hold the sensor state of line
/// `y`. The root is located to adjacent lines and then linearly interpolated.
pub fn zero_doppler_time(
    first_line_utc: f64,
    line_time_interval: f64,
    wavelength: f64,
    earth_point: &Vector3,
    sensor_position: &[Vector3],
    sensor_velocity: &[Vector3],
) -> f64 {
    let num_lines = sensor_position.len().min(sensor_velocity.len());
    if num_lines == 0 {
        return NON_VALID_ZERO_DOPPLER_TIME;
    }

    let freq = |y: usize| {
        doppler_frequency(earth_point, &sensor_position[y], &sensor_velocity[y], wavelength)
    };
    let line_time = |y: f64| first_line_utc + y * line_time_interval;

    let mut lower = 0;
    let mut upper = num_lines - 1;
    let mut lower_freq = freq(lower);
    let mut upper_freq = freq(upper);

    if lower_freq == 0.0 {
        return line_time(lower as f64);
    } else if upper_freq == 0.0 {
        return line_time(upper as f64);
    } else if !(lower_freq * upper_freq < 0.0) {
        return NON_VALID_ZERO_DOPPLER_TIME;
    }

    while upper - lower > 1 {
        let mid = (lower + upper) / 2;
        let mid_freq = freq(mid);

        if mid_freq == 0.0 {
            return line_time(mid as f64);
        } else if mid_freq * lower_freq > 0.0 {
            lower = mid;
            lower_freq = mid_freq;
        } else if mid_freq * upper_freq > 0.0 {
            upper = mid;
            upper_freq = mid_freq;
        } else {
            log::debug!("Non-finite Doppler frequency at line {}", mid);
            return NON_VALID_ZERO_DOPPLER_TIME;
        }
    }

    let y0 = lower as f64
        - lower_freq * (upper - lower) as f64 / (upper_freq - lower_freq);
    line_time(y0)
}

/// Zero-Doppler time (MJD2000 days) by a secant/Newton iteration over range
/// lines, finished with a linear interpolation between the final line and
/// its neighbour across the root.
///
/// Falls back to [`zero_doppler_time`] when the iteration does not settle or
/// the final interpolation lands more than a step away from the last line.
pub fn zero_doppler_time_newton(
    first_line_utc: f64,
    line_time_interval: f64,
    wavelength: f64,
    earth_point: &Vector3,
    sensor_position: &[Vector3],
    sensor_velocity: &[Vector3],
    max_iterations: usize,
) -> f64 {
    let num_lines = sensor_position.len().min(sensor_velocity.len());
    if num_lines == 0 {
        return NON_VALID_ZERO_DOPPLER_TIME;
    }

    let freq = |y: usize| {
        doppler_frequency(earth_point, &sensor_position[y], &sensor_velocity[y], wavelength)
    };
    let line_time = |y: f64| first_line_utc + y * line_time_interval;

    let y_max = num_lines - 1;
    let first_freq = freq(0);
    let last_freq = freq(y_max);

    if first_freq == 0.0 {
        return line_time(0.0);
    } else if last_freq == 0.0 {
        return line_time(y_max as f64);
    } else if !(first_freq * last_freq < 0.0) {
        return NON_VALID_ZERO_DOPPLER_TIME;
    }

    // A sign change needs at least two lines from here on
    let mut y_old = 0;
    let mut y_new = num_lines / 2;
    let mut iterations = 0;
    while y_new.abs_diff(y_old) > NEWTON_LINE_STEP && iterations < max_iterations {
        y_old = y_new;
        let y_old1 = if y_old < y_max { y_old + 1 } else { y_old - 1 };

        let f_old = freq(y_old);
        let f_old1 = freq(y_old1);
        let slope = (f_old1 - f_old) / (y_old1 as f64 - y_old as f64);

        // NaN saturates to line 0
        y_new = (y_old as f64 - f_old / slope).clamp(0.0, y_max as f64) as usize;
        iterations += 1;
    }

    if y_new.abs_diff(y_old) > NEWTON_LINE_STEP {
        log::warn!(
            "Newton zero-Doppler search stopped after {} iterations at line {}, using bisection",
            iterations, y_new
        );
        return zero_doppler_time(
            first_line_utc,
            line_time_interval,
            wavelength,
            earth_point,
            sensor_position,
            sensor_velocity,
        );
    }

    let f_new = freq(y_new);
    let (mut y_new1, fallback) = if y_new < y_max {
        (y_new + 1, y_new.checked_sub(1))
    } else {
        (y_new - 1, None)
    };
    let mut f_new1 = freq(y_new1);
    if f_new * f_new1 > 0.0 {
        if let Some(y) = fallback {
            y_new1 = y;
            f_new1 = freq(y);
        }
    }

    let y0 = y_new as f64 - f_new * (y_new1 as f64 - y_new as f64) / (f_new1 - f_new);

    // flat or stepped Doppler: the secant cannot be trusted beyond the last step
    if !((y0 - y_new as f64).abs() <= (NEWTON_LINE_STEP + 1) as f64) {
        log::debug!(
            "Newton zero-Doppler refinement left line {} for {}, using bisection",
            y_new, y0
        );
        return zero_doppler_time(
            first_line_utc,
            line_time_interval,
            wavelength,
            earth_point,
            sensor_position,
            sensor_velocity,
        );
    }
    line_time(y0)
}

/// Zero-Doppler time (MJD2000 days) from the orbit state vectors.
///
/// The state vectors are walked until the Doppler frequency changes sign,
/// then the bracket is bisected in time on the orbit polynomials until it is
/// no wider than one line, and finally interpolated linearly.
pub fn zero_doppler_time_from_orbit(
    line_time_interval: f64,
    wavelength: f64,
    earth_point: &Vector3,
    orbit: &mut Orbit,
) -> f64 {
    let mut bracket = None;
    let mut previous: Option<(f64, f64)> = None;
    for sv in orbit.state_vectors() {
        let freq = doppler_frequency(earth_point, &sv.position, &sv.velocity, wavelength);
        if freq == 0.0 {
            return sv.time;
        }
        if let Some((prev_time, prev_freq)) = previous {
            if prev_freq * freq < 0.0 {
                bracket = Some((prev_time, prev_freq, sv.time, freq));
                break;
            }
        }
        previous = Some((sv.time, freq));
    }

    let Some((mut lower_time, mut lower_freq, mut upper_time, mut upper_freq)) = bracket else {
        return NON_VALID_ZERO_DOPPLER_TIME;
    };

    let abs_line_time_interval = line_time_interval.abs();
    let mut diff_time = (upper_time - lower_time).abs();
    let total_iterations =
        ((diff_time / abs_line_time_interval) as usize + 1).min(MAX_BISECTION_ITERATIONS);

    let mut iterations = 0;
    while diff_time > abs_line_time_interval && iterations <= total_iterations {
        let mid_time = (upper_time + lower_time) / 2.0;
        let pv = orbit.position_velocity(mid_time);
        let mid_freq = doppler_frequency(earth_point, &pv.position, &pv.velocity, wavelength);

        if mid_freq == 0.0 {
            return mid_time;
        } else if mid_freq * lower_freq > 0.0 {
            lower_time = mid_time;
            lower_freq = mid_freq;
        } else if mid_freq * upper_freq > 0.0 {
            upper_time = mid_time;
            upper_freq = mid_freq;
        } else {
            log::debug!("Non-finite Doppler frequency at MJD {}", mid_time);
            return NON_VALID_ZERO_DOPPLER_TIME;
        }

        diff_time = (upper_time - lower_time).abs();
        iterations += 1;
    }

    lower_time - lower_freq * (upper_time - lower_time) / (upper_freq - lower_freq)
}

/// Zero-Doppler time (MJD2000 days) by Newton iteration in time on the orbit
/// polynomials, with the derivative taken as a secant over one line.
pub fn zero_doppler_time_newton_orbit(
    line_time_interval: f64,
    wavelength: f64,
    earth_point: &Vector3,
    orbit: &mut Orbit,
) -> f64 {
    let (first, last) = match (orbit.state_vectors().first(), orbit.state_vectors().last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return NON_VALID_ZERO_DOPPLER_TIME,
    };

    let first_freq = doppler_frequency(earth_point, &first.position, &first.velocity, wavelength);
    let last_freq = doppler_frequency(earth_point, &last.position, &last.velocity, wavelength);

    if first_freq == 0.0 {
        return first.time;
    } else if last_freq == 0.0 {
        return last.time;
    } else if !(first_freq * last_freq < 0.0) {
        return NON_VALID_ZERO_DOPPLER_TIME;
    }

    let mut frequency_at = |time: f64| {
        let pv = orbit.position_velocity(time);
        doppler_frequency(earth_point, &pv.position, &pv.velocity, wavelength)
    };

    let mut time = (first.time + last.time) / 2.0;
    let mut freq = frequency_at(time);
    let mut iterations = 0;
    while freq.abs() > NEWTON_FREQUENCY_TOLERANCE && iterations < NEWTON_MAX_ITERATIONS {
        let slope = (frequency_at(time + line_time_interval) - freq) / line_time_interval;
        time = (time - freq / slope).clamp(first.time, last.time);
        freq = frequency_at(time);
        iterations += 1;
    }

    if freq.is_nan() {
        return NON_VALID_ZERO_DOPPLER_TIME;
    }
    if freq.abs() > NEWTON_FREQUENCY_TOLERANCE {
        log::debug!(
            "Newton zero-Doppler search left {:.6} Hz after {} iterations",
            freq, iterations
        );
    }
    time
}
