//! I/O operations for reading and writing georeferenced rasters

#[cfg(feature = "gdal")]
mod gdal_io;
#[cfg_attr(feature = "gdal", allow(dead_code))]
mod native;
mod options;

#[cfg(feature = "gdal")]
pub use gdal_io::{read_geotiff, read_metadata, read_stack, write_geotiff};

#[cfg(not(feature = "gdal"))]
pub use native::{read_geotiff, read_metadata, read_stack, write_geotiff};

// Buffer-based I/O (always available, no filesystem dependency)
pub use native::{read_geotiff_from_buffer, read_stack_from_buffer, write_geotiff_to_buffer};

pub use options::{unscale, DataType, GeoTiffOptions};
