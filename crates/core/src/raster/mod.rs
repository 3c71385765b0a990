//! Raster data structures and operations

mod compare;
mod element;
mod geotransform;
mod grid;
mod stack;

pub use compare::{compare_rasters, Compatibility, Mismatch, Mismatches};
pub use element::RasterElement;
pub use geotransform::{Extent, GeoTransform};
pub use grid::{Raster, RasterMetadata, RasterStatistics};
pub use stack::RasterStack;
