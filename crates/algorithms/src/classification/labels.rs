//! Writing per-pixel labels back onto a grid

use canopy_core::raster::{Raster, RasterElement};
use canopy_core::{Error, Result};

/// No-data value of label rasters; never a cluster label
pub const LABEL_NODATA: i32 = 0;

/// Rebuild a label raster on `template`'s grid.
///
/// `labels` fill the cells where `mask` is `false`, in row-major order;
/// masked cells get [`LABEL_NODATA`]. The mask must have one flag per cell
/// and exactly `labels.len()` unmasked cells.
pub fn labels_to_raster<T: RasterElement>(
    labels: &[u32],
    template: &Raster<T>,
    mask: &[bool],
) -> Result<Raster<i32>> {
    let (rows, cols) = template.shape();
    let masked = mask.iter().filter(|&&m| m).count();

    if mask.len() != rows * cols || labels.len() + masked != rows * cols {
        return Err(Error::ShapeMismatch {
            labels: labels.len(),
            masked,
            rows,
            cols,
        });
    }

    let mut next = labels.iter();
    let mut data = Vec::with_capacity(rows * cols);
    for &skip in mask {
        if skip {
            data.push(LABEL_NODATA);
            continue;
        }
        let label = next.next().copied().unwrap_or_default();
        let value = i32::try_from(label)
            .map_err(|_| Error::invalid_parameter("labels", label, "label exceeds i32 range"))?;
        data.push(value);
    }

    template.with_data(data, Some(LABEL_NODATA))
}
