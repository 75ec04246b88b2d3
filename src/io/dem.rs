use crate::types::{GeoPos, GeoTransform, SarError, SarResult};
use ndarray::Array2;

/// Source of terrain heights above the ellipsoid
pub trait ElevationModel {
    /// Height in meters at a geodetic position, `None` where no data is available
    fn elevation(&self, lat: f64, lon: f64) -> Option<f64>;
}

/// Maps fractional pixel coordinates of a raster to geodetic positions
pub trait PixelGeoreference {
    /// Position of pixel `(x, y)` where `x` is the column and `y` the row.
    /// Integer coordinates refer to pixel centres.
    fn geo_pos(&self, x: f64, y: f64) -> GeoPos;
}

impl PixelGeoreference for GeoTransform {
    fn geo_pos(&self, x: f64, y: f64) -> GeoPos {
        let (px, py) = (x + 0.5, y + 0.5);
        let lon = self.top_left_x + px * self.pixel_width + py * self.rotation_x;
        let lat = self.top_left_y + px * self.rotation_y + py * self.pixel_height;
        GeoPos::new(lat, lon)
    }
}

/// Digital elevation model held in memory on a north-up lat/lon grid
#[derive(Debug, Clone)]
pub struct GriddedDem {
    data: Array2<f32>,
    geo_transform: GeoTransform,
    no_data: f32,
}

impl GriddedDem {
    /// Wrap a DEM raster (rows = latitude, columns = longitude)
    pub fn new(data: Array2<f32>, geo_transform: GeoTransform, no_data: f32) -> SarResult<Self> {
        let (height, width) = data.dim();
        if height == 0 || width == 0 {
            return Err(SarError::InvalidParameter("empty DEM raster".to_string()));
        }
        if geo_transform.pixel_width == 0.0 || geo_transform.pixel_height == 0.0 {
            return Err(SarError::InvalidParameter("DEM pixel size must be non-zero".to_string()));
        }
        if geo_transform.rotation_x != 0.0 || geo_transform.rotation_y != 0.0 {
            return Err(SarError::InvalidParameter(
                "rotated DEM geotransforms are not supported".to_string(),
            ));
        }

        log::debug!("DEM size: {}x{}", width, height);
        log::debug!("DEM geotransform: {:?}", geo_transform);

        Ok(Self { data, geo_transform, no_data })
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    pub fn no_data(&self) -> f32 {
        self.no_data
    }

    /// (rows, columns)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_no_data(&self, value: f32) -> bool {
        value == self.no_data || value.is_nan()
    }

    /// Height of one grid cell
    pub fn height_at(&self, row: usize, col: usize) -> Option<f64> {
        let value = *self.data.get([row, col])?;
        if self.is_no_data(value) {
            None
        } else {
            Some(value as f64)
        }
    }
}

impl ElevationModel for GriddedDem {
    /// Bilinear interpolation between the four surrounding cell centres
    fn elevation(&self, lat: f64, lon: f64) -> Option<f64> {
        let gt = &self.geo_transform;
        let col = (lon - gt.top_left_x) / gt.pixel_width - 0.5;
        let row = (lat - gt.top_left_y) / gt.pixel_height - 0.5;

        let (height, width) = self.data.dim();
        if !(col >= 0.0 && row >= 0.0 && col <= (width - 1) as f64 && row <= (height - 1) as f64) {
            return None;
        }

        let x1 = col.floor() as usize;
        let y1 = row.floor() as usize;
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let dx = col - x1 as f64;
        let dy = row - y1 as f64;

        let v11 = self.height_at(y1, x1)?;
        let v12 = self.height_at(y2, x1)?;
        let v21 = self.height_at(y1, x2)?;
        let v22 = self.height_at(y2, x2)?;

        Some(
            v11 * (1.0 - dx) * (1.0 - dy)
                + v21 * dx * (1.0 - dy)
                + v12 * (1.0 - dx) * dy
                + v22 * dx * dy,
        )
    }
}

impl PixelGeoreference for GriddedDem {
    fn geo_pos(&self, x: f64, y: f64) -> GeoPos {
        self.geo_transform.geo_pos(x, y)
    }
}
