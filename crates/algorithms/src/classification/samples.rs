//! Feature matrices of valid pixels

use ndarray::{Array2, ArrayView1, ArrayView2};
use canopy_core::raster::{Raster, RasterStack};
use canopy_core::{Error, Result};

/// Valid pixels of a raster or stack, flattened to feature vectors.
///
/// Row `i` of [`values`](Self::values) is the i-th valid cell in row-major
/// order. The mask has one flag per grid cell, `true` where the cell was
/// filtered out, so labels can be written back to the grid afterwards.
#[derive(Debug, Clone)]
pub struct PixelSamples {
    values: Array2<f64>,
    rows: usize,
    cols: usize,
    mask: Vec<bool>,
}

impl PixelSamples {
    /// One feature per pixel. No-data and non-finite cells are excluded.
    pub fn from_raster(raster: &Raster<f64>) -> Result<Self> {
        let (rows, cols) = raster.shape();
        let mut values = Vec::with_capacity(raster.len());
        let mask: Vec<bool> = raster
            .data()
            .iter()
            .map(|&v| {
                let skip = raster.is_nodata(v) || !v.is_finite();
                if !skip {
                    values.push(v);
                }
                skip
            })
            .collect();

        Self::from_parts(values, 1, rows, cols, mask)
    }

    /// One feature per band, in channel order. A cell is excluded when any
    /// band is no-data there.
    pub fn from_stack(stack: &RasterStack<f64>) -> Result<Self> {
        let (rows, cols) = stack.shape();
        let features = stack.band_count();
        let mut values = Vec::with_capacity(rows * cols * features);
        let mut mask = Vec::with_capacity(rows * cols);
        let mut pixel = Vec::with_capacity(features);

        for row in 0..rows {
            for col in 0..cols {
                pixel.clear();
                let mut valid = true;
                for band in stack.bands() {
                    let v = unsafe { band.get_unchecked(row, col) };
                    valid &= !band.is_nodata(v) && v.is_finite();
                    pixel.push(v);
                }
                if valid {
                    values.extend_from_slice(&pixel);
                }
                mask.push(!valid);
            }
        }

        Self::from_parts(values, features, rows, cols, mask)
    }

    /// Assemble samples from row-major feature values and a grid mask.
    ///
    /// `values` must hold `features` numbers for every `false` cell of `mask`.
    pub fn from_parts(
        values: Vec<f64>,
        features: usize,
        rows: usize,
        cols: usize,
        mask: Vec<bool>,
    ) -> Result<Self> {
        if features == 0 {
            return Err(Error::invalid_parameter("features", 0, "must be >= 1"));
        }
        if mask.len() != rows * cols {
            return Err(Error::invalid_parameter(
                "mask",
                mask.len(),
                format!("expected one flag per cell of a {}x{} grid", rows, cols),
            ));
        }
        let valid = mask.iter().filter(|&&m| !m).count();
        let values = Array2::from_shape_vec((valid, features), values)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            values,
            rows,
            cols,
            mask,
        })
    }

    /// Number of valid pixels
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Features per pixel
    pub fn features(&self) -> usize {
        self.values.ncols()
    }

    /// Source grid shape (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// `n_valid x features` matrix
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Feature vector of the i-th valid pixel
    pub fn sample(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Cells excluded from the samples
    pub fn nodata_count(&self) -> usize {
        self.mask.len() - self.len()
    }
}
