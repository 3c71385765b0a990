//! Imagery analysis algorithms
//!
//! - Spectral indices: NDVI, NDWI, MNDWI, NBR, GNDVI
//! - Normalized difference: generic two-band ratio
//! - Threshold mask and value histograms over index layers

mod histogram;
mod indices;
mod mask;

pub use histogram::{histogram, Histogram, HistogramParams};
pub use indices::{
    gndvi, mndwi, nbr, ndvi, ndvi_from_stack, ndwi, normalized_difference,
    NormalizedDifference, SpectralIndex,
};
pub use mask::{mask, MaskParams, ThresholdMask};
