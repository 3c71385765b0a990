//! # Canopy Core
//!
//! Core types, traits and I/O for the Canopy raster toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid
//! - `RasterStack<T>`: Ordered stack of compatible bands
//! - `GeoTransform`, `Extent`: Affine georeferencing and bounding boxes
//! - `CRS`: Coordinate Reference System handling
//! - Compatibility checks between bands
//! - GeoTIFF I/O (native `tiff` backend, optional GDAL backend)

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{
    compare_rasters, Compatibility, Extent, GeoTransform, Mismatch, Raster, RasterElement,
    RasterMetadata, RasterStack,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        compare_rasters, Compatibility, Extent, GeoTransform, Raster, RasterElement, RasterStack,
    };
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in Canopy.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
