//! Unsupervised classification of raster pixels
//!
//! - **Samples**: valid pixels of a raster or band stack as feature vectors
//! - **K-means**: seeded multi-start clustering
//! - **Labels**: writing cluster labels back onto the source grid

mod kmeans;
mod labels;
mod samples;

pub use kmeans::{kmeans, kmeans_raster, kmeans_stack, Kmeans, KmeansModel, KmeansParams, KmeansResult};
pub use labels::{labels_to_raster, LABEL_NODATA};
pub use samples::PixelSamples;
