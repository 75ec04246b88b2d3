use crate::types::{SarError, SarResult, Vector3};
use nalgebra::DMatrix;

/// Scale a vector to unit length in place.
///
/// A zero-length vector turns into NaN components; callers are expected to
/// exclude degenerate geometry upstream.
#[inline]
pub fn normalize(v: &mut Vector3) {
    let norm = v.norm();
    *v /= norm;
}

/// Inner (dot) product of two vectors
#[inline]
pub fn inner_product(a: &Vector3, b: &Vector3) -> f64 {
    a.dot(b)
}

/// Cross product `a x b`
#[inline]
pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
    a.cross(b)
}

/// Build the Vandermonde design matrix `A[i][j] = t_i^j` for a polynomial of
/// the given degree. Rows follow the order of `times`.
pub fn vandermonde(times: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(times.len(), degree + 1, |i, j| times[i].powi(j as i32))
}

/// Least-squares polynomial fit against a design matrix from [`vandermonde`].
///
/// Returns the coefficients lowest order first. With exactly `degree + 1`
/// samples the result interpolates the samples.
pub fn poly_fit(design: &DMatrix<f64>, values: &[f64]) -> SarResult<Vec<f64>> {
    let rhs = DMatrix::from_column_slice(values.len(), 1, values);
    let coeffs = poly_fit_columns(design, &rhs)?;
    Ok(coeffs.column(0).iter().copied().collect())
}

/// Fit several sample columns against the same design matrix at once.
///
/// Column `k` of the result holds the coefficients for column `k` of `values`.
/// The system is solved through a Householder QR factorisation so the badly
/// scaled columns of a Vandermonde matrix do not square its condition number.
pub fn poly_fit_columns(design: &DMatrix<f64>, values: &DMatrix<f64>) -> SarResult<DMatrix<f64>> {
    let (rows, cols) = design.shape();
    if values.nrows() != rows {
        return Err(SarError::InvalidParameter(format!(
            "polynomial fit has {} design rows but {} samples", rows, values.nrows()
        )));
    }
    if rows < cols {
        return Err(SarError::InvalidParameter(format!(
            "polynomial fit of {} coefficients needs at least {} samples, got {}",
            cols, cols, rows
        )));
    }

    let qr = design.clone().qr();
    let qtb = qr.q().transpose() * values;
    qr.r()
        .solve_upper_triangular(&qtb)
        .ok_or_else(|| SarError::Processing("rank deficient polynomial design matrix".to_string()))
}

/// Evaluate a polynomial (coefficients lowest order first) with Horner's scheme
#[inline]
pub fn poly_val(t: f64, coeffs: &[f64]) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

/// Linear interpolation between `y0` (mu = 0) and `y1` (mu = 1)
#[inline]
pub fn interpolation_linear(y0: f64, y1: f64, mu: f64) -> f64 {
    (1.0 - mu) * y0 + mu * y1
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_normalize_unit_length() {
        let mut v = Vector3::new(3.0, 4.0, 12.0);
        normalize(&mut v);
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(v.x, 3.0 / 13.0, epsilon = 1e-15);
    }

    #[test]
    fn test_normalize_zero_vector_is_nan() {
        let mut v = Vector3::zeros();
        normalize(&mut v);
        assert!(v.x.is_nan() && v.y.is_nan() && v.z.is_nan());
    }

    #[test]
    fn test_cross_and_inner_product() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        let z = cross(&x, &y);
        assert_eq!(z, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(inner_product(&x, &y), 0.0);
        assert_eq!(inner_product(&z, &z), 1.0);
        // inputs untouched
        assert_eq!(x, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_vandermonde_layout() {
        let a = vandermonde(&[2.0, 3.0], 3);
        assert_eq!(a.shape(), (2, 4));
        assert_eq!(a[(0, 0)], 1.0);
        assert_eq!(a[(0, 3)], 8.0);
        assert_eq!(a[(1, 2)], 9.0);
    }

    #[test]
    fn test_cubic_fit_interpolates_four_points() {
        // Orbit-like magnitudes: time offsets in days, values in meters
        let times = [-2.3e-4, -1.15e-4, 0.0, 1.15e-4];
        let values = [6_912_345.0, 6_955_120.5, 6_998_001.25, 7_040_777.0];
        let a = vandermonde(&times, 3);
        let coeffs = poly_fit(&a, &values).unwrap();
        assert_eq!(coeffs.len(), 4);
        for (t, v) in times.iter().zip(values.iter()) {
            assert_relative_eq!(poly_val(*t, &coeffs), *v, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_least_squares_line() {
        // closed form: slope = Sxy / Sxx = 9 / 5, intercept = 4 - 1.8 * 1.5
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [1.5, 2.5, 5.5, 6.5];
        let coeffs = poly_fit(&vandermonde(&times, 1), &values).unwrap();
        assert_abs_diff_eq!(coeffs[0], 1.3, epsilon = 1e-12);
        assert_abs_diff_eq!(coeffs[1], 1.8, epsilon = 1e-12);
    }

    #[test]
    fn test_poly_fit_rejects_underdetermined_system() {
        let a = vandermonde(&[0.0, 1.0], 3);
        assert!(poly_fit(&a, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_poly_val_horner() {
        // 1 + 2t + 3t^2 at t = 2
        assert_eq!(poly_val(2.0, &[1.0, 2.0, 3.0]), 17.0);
        assert_eq!(poly_val(5.0, &[]), 0.0);
    }

    #[test]
    fn test_interpolation_linear() {
        assert_eq!(interpolation_linear(10.0, 20.0, 0.0), 10.0);
        assert_eq!(interpolation_linear(10.0, 20.0, 1.0), 20.0);
        assert_eq!(interpolation_linear(10.0, 20.0, 0.25), 12.5);
    }
}
