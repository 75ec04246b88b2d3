use crate::core::ellipsoid::{geo_to_xyz, EarthModel};
use crate::core::maths::{cross, inner_product, normalize};
use crate::io::dem::{ElevationModel, PixelGeoreference};
use crate::types::{GeoPos, Vector3};
use ndarray::ArrayView2;

/// Neighbourhood of one DEM pixel needed for the incidence angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGeometry {
    pub left_point: GeoPos,
    pub right_point: GeoPos,
    pub up_point: GeoPos,
    pub down_point: GeoPos,
    /// Earth point of the pixel centre (ECEF)
    pub centre_point: Vector3,
    /// Sensor position at the zero-Doppler time of the centre point (ECEF)
    pub sensor_pos: Vector3,
    /// Ellipsoid the geodetic neighbours are placed on
    pub earth_model: EarthModel,
}

impl LocalGeometry {
    /// Geometry of grid pixel `(row, col)` with its four direct neighbours
    pub fn from_grid<G: PixelGeoreference + ?Sized>(
        georef: &G,
        row: usize,
        col: usize,
        centre_point: Vector3,
        sensor_pos: Vector3,
    ) -> Self {
        let (x, y) = (col as f64, row as f64);
        Self {
            left_point: georef.geo_pos(x - 1.0, y),
            right_point: georef.geo_pos(x + 1.0, y),
            up_point: georef.geo_pos(x, y - 1.0),
            down_point: georef.geo_pos(x, y + 1.0),
            centre_point,
            sensor_pos,
            earth_model: EarthModel::Wgs84,
        }
    }

    /// Use `earth_model` for the neighbour points; it should match the one
    /// `centre_point` was computed on
    pub fn with_earth_model(mut self, earth_model: EarthModel) -> Self {
        self.earth_model = earth_model;
        self
    }
}

/// Incidence angles in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidenceAngles {
    pub local: f64,
    /// Measured in the range plane
    pub projected: f64,
}

/// Incidence angles of `local_dem[(row, col)]` from its 3x3 neighbourhood.
///
/// Returns `None` when the window leaves the array or contains no-data.
pub fn compute_local_incidence_angle(
    lg: &LocalGeometry,
    local_dem: ArrayView2<'_, f32>,
    row: usize,
    col: usize,
    dem_no_data: f32,
) -> Option<IncidenceAngles> {
    let (rows, cols) = local_dem.dim();
    if row == 0 || col == 0 || row + 1 >= rows || col + 1 >= cols {
        return None;
    }

    let window = local_dem.slice(ndarray::s![row - 1..=row + 1, col - 1..=col + 1]);
    if window.iter().any(|&h| is_no_data(h, dem_no_data)) {
        return None;
    }

    let column_mean = |c: usize| window.column(c).iter().map(|&h| h as f64).sum::<f64>() / 3.0;
    let row_mean = |r: usize| window.row(r).iter().map(|&h| h as f64).sum::<f64>() / 3.0;

    let heights = NeighbourHeights {
        left: column_mean(0),
        right: column_mean(2),
        up: row_mean(0),
        down: row_mean(2),
    };

    Some(incidence_angles(lg, &heights, &lg.centre_point))
}

/// Incidence angles of `local_dem[(row, col)]` for pixels near the edge of
/// the local array.
///
/// Each direction averages up to three heights starting at the centre pixel.
/// Samples beyond the array are read from `dem` at the position `georef`
/// gives for the local array's pixel coordinates. No-data samples are
/// skipped; a direction without any valid sample, or a missing centre
/// height, yields `None`.
pub fn compute_local_incidence_angle_with_fallback<G, E>(
    lg: &LocalGeometry,
    local_dem: ArrayView2<'_, f32>,
    row: usize,
    col: usize,
    dem_no_data: f32,
    georef: &G,
    dem: &E,
) -> Option<IncidenceAngles>
where
    G: PixelGeoreference + ?Sized,
    E: ElevationModel + ?Sized,
{
    let (rows, cols) = local_dem.dim();
    let centre_height = *local_dem.get([row, col])?;
    let (row, col) = (row as isize, col as isize);

    let sample = |r: isize, c: isize| -> Option<f64> {
        let inside = r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols;
        let height = if inside {
            local_dem[[r as usize, c as usize]] as f64
        } else {
            let pos = georef.geo_pos(c as f64, r as f64);
            dem.elevation(pos.lat, pos.lon)?
        };
        if is_no_data(height as f32, dem_no_data) {
            None
        } else {
            Some(height)
        }
    };

    let mean = |step_r: isize, step_c: isize| -> Option<f64> {
        let (sum, count) = (0..3)
            .filter_map(|n| sample(row + n * step_r, col + n * step_c))
            .fold((0.0, 0usize), |(sum, count), h| (sum + h, count + 1));
        (count > 0).then(|| sum / count as f64)
    };

    let heights = NeighbourHeights {
        right: mean(0, 1)?,
        left: mean(0, -1)?,
        up: mean(-1, 0)?,
        down: mean(1, 0)?,
    };

    if is_no_data(centre_height, dem_no_data) {
        return None;
    }
    let centre = georef.geo_pos(col as f64, row as f64);
    let centre_point = geo_to_xyz(centre.lat, centre.lon, centre_height as f64, lg.earth_model);

    Some(incidence_angles(lg, &heights, &centre_point))
}

struct NeighbourHeights {
    left: f64,
    right: f64,
    up: f64,
    down: f64,
}

#[inline]
fn is_no_data(height: f32, no_data: f32) -> bool {
    height == no_data || height.is_nan()
}

#[inline]
fn clamped_acos_degrees(cos: f64) -> f64 {
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

fn incidence_angles(lg: &LocalGeometry, heights: &NeighbourHeights, centre: &Vector3) -> IncidenceAngles {
    let model = lg.earth_model;
    let right = geo_to_xyz(lg.right_point.lat, lg.right_point.lon, heights.right, model);
    let left = geo_to_xyz(lg.left_point.lat, lg.left_point.lon, heights.left, model);
    let up = geo_to_xyz(lg.up_point.lat, lg.up_point.lon, heights.up, model);
    let down = geo_to_xyz(lg.down_point.lat, lg.down_point.lon, heights.down, model);

    // ground plane normal, pointing away from the earth centre
    let mut n = cross(&(right - left), &(down - up));
    normalize(&mut n);
    if inner_product(&n, centre) < 0.0 {
        n = -n;
    }

    let mut s = lg.sensor_pos - centre;
    normalize(&mut s);

    let local = clamped_acos_degrees(inner_product(&n, &s));

    // range plane normal
    let mut m = cross(&s, centre);
    let projected = if m.norm() == 0.0 {
        local
    } else {
        normalize(&mut m);
        let mut n1 = n - m * inner_product(&m, &n);
        normalize(&mut n1);
        clamped_acos_degrees(inner_product(&n1, &s))
    };

    IncidenceAngles { local, projected }
}
