//! Elevation data providers

pub mod dem;

pub use dem::{ElevationModel, GriddedDem, PixelGeoreference};
