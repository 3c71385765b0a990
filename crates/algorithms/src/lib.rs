//! # Canopy Algorithms
//!
//! Spectral analysis and clustering for multi-band rasters.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Normalized-difference indices, threshold mask, histograms
//! - **classification**: Pixel sampling, k-means, label rasters

pub mod classification;
pub mod imagery;
pub(crate) mod maybe_rayon;

pub use maybe_rayon::worker_count;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        kmeans, kmeans_raster, kmeans_stack, labels_to_raster,
        Kmeans, KmeansModel, KmeansParams, KmeansResult, PixelSamples,
    };
    pub use crate::imagery::{
        histogram, mask, ndvi, ndvi_from_stack, normalized_difference,
        Histogram, HistogramParams, MaskParams, NormalizedDifference, SpectralIndex, ThresholdMask,
    };
    pub use canopy_core::prelude::*;
}
