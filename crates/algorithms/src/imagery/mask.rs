//! Threshold masking of index layers

use crate::maybe_rayon::*;
use canopy_core::raster::Raster;
use canopy_core::{Algorithm, Error, Result};

/// Parameters for [`mask`]
#[derive(Debug, Clone)]
pub struct MaskParams {
    /// Cells strictly below this value become no-data
    pub threshold: f64,
}

impl Default for MaskParams {
    /// 0.4: the usual cut for likely-vegetation NDVI pixels
    fn default() -> Self {
        Self { threshold: 0.4 }
    }
}

/// Set every cell below `threshold` to no-data.
///
/// Cells at or above the threshold keep their value, no-data stays no-data.
/// Applying the same mask twice gives the same layer.
///
/// ```ignore
/// let vegetation = mask(&ndvi_layer, 0.4)?;
/// ```
pub fn mask(layer: &Raster<f64>, threshold: f64) -> Result<Raster<f64>> {
    if !threshold.is_finite() {
        return Err(Error::invalid_parameter(
            "threshold",
            threshold,
            "must be a finite number",
        ));
    }

    let (rows, cols) = layer.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let v = unsafe { layer.get_unchecked(row, col) };
                if !layer.is_nodata(v) && v >= threshold {
                    *cell = v;
                }
            }
            row_data
        })
        .collect();

    layer.with_data(data, Some(f64::NAN))
}

/// Threshold mask as an [`Algorithm`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdMask;

impl Algorithm for ThresholdMask {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = MaskParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Threshold Mask"
    }

    fn description(&self) -> &'static str {
        "Set cells below a threshold to no-data"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        mask(&input, params.threshold)
    }
}
