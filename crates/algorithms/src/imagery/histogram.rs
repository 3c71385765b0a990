//! Value histograms over valid cells

use canopy_core::raster::{Raster, RasterElement};
use canopy_core::{Error, Result};

/// Parameters for [`histogram`]
#[derive(Debug, Clone)]
pub struct HistogramParams {
    /// Number of equal-width bins
    pub bins: usize,
    /// Binned range `(min, max)`; `None` uses the valid data's min and max
    pub range: Option<(f64, f64)>,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            bins: 20,
            range: None,
        }
    }
}

/// Histogram of a raster's valid cells
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` bin edges, ascending
    pub edges: Vec<f64>,
    /// Cells per bin; the last bin includes its upper edge
    pub counts: Vec<usize>,
    /// No-data cells, never binned
    pub nodata_count: usize,
    /// Valid cells outside an explicit range
    pub out_of_range: usize,
}

impl Histogram {
    /// Number of binned cells
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(lower edge, upper edge, count)` per bin
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter())
            .map(|(w, &c)| (w[0], w[1], c))
    }
}

/// Equal-width histogram of a raster.
///
/// No-data cells (and `NaN`) are counted in `nodata_count` only, so they
/// never shift a bin.
pub fn histogram<T: RasterElement>(raster: &Raster<T>, params: HistogramParams) -> Result<Histogram> {
    if params.bins == 0 {
        return Err(Error::invalid_parameter("bins", 0, "must be >= 1"));
    }

    let mut values = Vec::with_capacity(raster.len());
    let mut nodata_count = 0usize;
    for &v in raster.data().iter() {
        match v.to_f64() {
            Some(x) if !raster.is_nodata(v) && x.is_finite() => values.push(x),
            _ => nodata_count += 1,
        }
    }

    let (lo, hi) = match params.range {
        Some((lo, hi)) => {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::invalid_parameter(
                    "range",
                    format!("({}, {})", lo, hi),
                    "must be finite with min < max",
                ));
            }
            (lo, hi)
        }
        None => {
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if values.is_empty() {
                (0.0, 1.0)
            } else if lo == hi {
                (lo - 0.5, hi + 0.5)
            } else {
                (lo, hi)
            }
        }
    };

    let width = (hi - lo) / params.bins as f64;
    let edges: Vec<f64> = (0..=params.bins).map(|i| lo + i as f64 * width).collect();
    let mut counts = vec![0usize; params.bins];
    let mut out_of_range = 0usize;

    for v in values {
        if v < lo || v > hi {
            out_of_range += 1;
            continue;
        }
        let bin = (((v - lo) / width) as usize).min(params.bins - 1);
        counts[bin] += 1;
    }

    Ok(Histogram {
        edges,
        counts,
        nodata_count,
        out_of_range,
    })
}
