//! Normalized-difference spectral indices
//!
//! All indices here have the form `(a - b) / (a + b)` over two bands of one
//! grid. Cells where either band is no-data, or where `a + b == 0`, are
//! written as no-data (`NaN`, declared as the output's no-data value).

use crate::maybe_rayon::*;
use canopy_core::raster::{compare_rasters, Raster, RasterStack};
use canopy_core::{Algorithm, Error, Result};

/// Supported normalized-difference indices with their band roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index: (NIR - Red) / (NIR + Red)
    NDVI,
    /// Normalized Difference Water Index (McFeeters): (Green - NIR) / (Green + NIR)
    NDWI,
    /// Modified NDWI (Xu): (Green - SWIR) / (Green + SWIR)
    MNDWI,
    /// Normalized Burn Ratio: (NIR - SWIR) / (NIR + SWIR)
    NBR,
    /// Green NDVI: (NIR - Green) / (NIR + Green)
    GNDVI,
}

impl SpectralIndex {
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::NDWI => "NDWI",
            SpectralIndex::MNDWI => "MNDWI",
            SpectralIndex::NBR => "NBR",
            SpectralIndex::GNDVI => "GNDVI",
        }
    }

    /// Band names for the positive and negative terms
    pub fn band_roles(&self) -> (&'static str, &'static str) {
        match self {
            SpectralIndex::NDVI => ("nir", "red"),
            SpectralIndex::NDWI => ("green", "nir"),
            SpectralIndex::MNDWI => ("green", "swir"),
            SpectralIndex::NBR => ("nir", "swir"),
            SpectralIndex::GNDVI => ("nir", "green"),
        }
    }

    /// Compute the index from its two bands, in [`band_roles`](Self::band_roles) order
    pub fn compute(&self, positive: &Raster<f64>, negative: &Raster<f64>) -> Result<Raster<f64>> {
        normalized_difference(positive, negative)
    }
}

/// Compute the normalized difference between two bands:
///
/// `(band_k - band_i) / (band_k + band_i)`
///
/// The bands must be compatible (same dimensions, resolution, extent and
/// CRS). The result lies in [-1, 1] for non-negative inputs.
///
/// # Arguments
/// * `band_k` - Positive term
/// * `band_i` - Negative term
pub fn normalized_difference(band_k: &Raster<f64>, band_i: &Raster<f64>) -> Result<Raster<f64>> {
    let check = compare_rasters(band_k, band_i);
    if !check.is_compatible() {
        return Err(Error::IncompatibleBands {
            index: 2,
            mismatches: check.into_mismatches(),
        });
    }

    let (rows, cols) = band_k.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let k = unsafe { band_k.get_unchecked(row, col) };
                let i = unsafe { band_i.get_unchecked(row, col) };

                if band_k.is_nodata(k) || band_i.is_nodata(i) {
                    continue;
                }

                let sum = k + i;
                if sum == 0.0 {
                    continue;
                }

                *cell = (k - i) / sum;
            }
            row_data
        })
        .collect();

    band_k.with_data(data, Some(f64::NAN))
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Typical values:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// NDVI from two bands of a stack, by 1-based band index
///
/// ```ignore
/// // Landsat 8: band 5 = NIR, band 4 = red
/// let layer = ndvi_from_stack(&scene, 5, 4)?;
/// ```
pub fn ndvi_from_stack(stack: &RasterStack<f64>, nir_band: usize, red_band: usize) -> Result<Raster<f64>> {
    normalized_difference(stack.band(nir_band)?, stack.band(red_band)?)
}

/// Normalized Difference Water Index (McFeeters, 1996). Positive over water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Modified Normalized Difference Water Index (Xu, 2006)
pub fn mndwi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, swir)
}

/// Normalized Burn Ratio. Low values indicate burned areas.
pub fn nbr(nir: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, swir)
}

/// Green Normalized Difference Vegetation Index
pub fn gndvi(nir: &Raster<f64>, green: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, green)
}

/// Normalized-difference index as an [`Algorithm`]
#[derive(Debug, Clone, Copy)]
pub struct NormalizedDifference(pub SpectralIndex);

impl Default for NormalizedDifference {
    fn default() -> Self {
        Self(SpectralIndex::NDVI)
    }
}

impl Algorithm for NormalizedDifference {
    type Input = (Raster<f64>, Raster<f64>);
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn description(&self) -> &'static str {
        "Pixel-wise normalized difference (a - b) / (a + b) of two bands"
    }

    fn execute(&self, input: Self::Input, _params: ()) -> Result<Self::Output> {
        self.0.compute(&input.0, &input.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{GeoTransform, CRS};

    fn make_band(rows: usize, cols: usize, values: &[f64]) -> Raster<f64> {
        let mut r = Raster::from_vec(values.to_vec(), rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r.set_crs(Some(CRS::utm_north(33)));
        r
    }

    fn round3(v: f64) -> f64 {
        (v * 1000.0).round() / 1000.0
    }

    #[test]
    fn test_two_by_two_scenario() {
        let a = make_band(2, 2, &[0.8, 0.8, 0.1, 0.1]);
        let b = make_band(2, 2, &[0.2, 0.2, 0.5, 0.5]);

        let result = normalized_difference(&a, &b).unwrap();
        let rounded: Vec<f64> = result.to_vec().into_iter().map(round3).collect();
        assert_eq!(rounded, vec![0.6, 0.6, -0.667, -0.667]);
        assert_eq!(result.transform(), a.transform());
        assert_eq!(result.crs(), a.crs());
        assert!(result.nodata().unwrap().is_nan());
    }

    #[test]
    fn test_zero_denominator_is_nodata() {
        let nir = make_band(1, 3, &[0.0, 0.4, 0.0]);
        let red = make_band(1, 3, &[0.0, 0.0, 0.3]);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.is_nodata_at(0, 0).unwrap());
        assert_eq!(result.get(0, 1).unwrap(), 1.0);
        assert_eq!(result.get(0, 2).unwrap(), -1.0);

        let stats = result.statistics();
        assert_eq!(stats.valid_count, 2);
        assert_eq!(stats.mean, Some(0.0));
    }

    #[test]
    fn test_bounded_for_nonnegative_inputs() {
        let n = 64;
        let k: Vec<f64> = (0..n).map(|i| (i % 7) as f64 * 0.13).collect();
        let i: Vec<f64> = (0..n).map(|i| (i % 5) as f64 * 0.21).collect();
        let result = normalized_difference(&make_band(8, 8, &k), &make_band(8, 8, &i)).unwrap();

        for (idx, v) in result.to_vec().into_iter().enumerate() {
            if k[idx] + i[idx] == 0.0 {
                assert!(v.is_nan(), "cell {} should be no-data", idx);
            } else {
                assert!((-1.0..=1.0).contains(&v), "cell {} = {}", idx, v);
            }
        }
    }

    #[test]
    fn test_input_nodata_propagates() {
        let mut nir = make_band(1, 2, &[0.5, -9999.0]);
        nir.set_nodata(Some(-9999.0));
        let red = make_band(1, 2, &[0.1, 0.1]);

        let result = ndvi(&nir, &red).unwrap();
        assert!(!result.is_nodata_at(0, 0).unwrap());
        assert!(result.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_incompatible_bands() {
        let a = make_band(2, 2, &[1.0; 4]);
        let b = make_band(2, 3, &[1.0; 6]);
        assert!(matches!(
            normalized_difference(&a, &b),
            Err(Error::IncompatibleBands { index: 2, .. })
        ));

        let mut c = a.clone();
        c.set_crs(Some(CRS::utm_north(34)));
        match normalized_difference(&a, &c) {
            Err(Error::IncompatibleBands { mismatches, .. }) => {
                assert_eq!(mismatches.0.len(), 1);
                assert_eq!(mismatches.0[0].attribute(), "crs");
            }
            other => panic!("expected IncompatibleBands, got {:?}", other),
        }
    }

    #[test]
    fn test_ndvi_from_stack() {
        let red = make_band(1, 2, &[0.1, 0.2]);
        let nir = make_band(1, 2, &[0.5, 0.2]);
        let stack = RasterStack::new(vec![red, nir]).unwrap();

        let result = ndvi_from_stack(&stack, 2, 1).unwrap();
        assert!((result.get(0, 0).unwrap() - 0.4 / 0.6).abs() < 1e-12);
        assert_eq!(result.get(0, 1).unwrap(), 0.0);
        assert!(matches!(
            ndvi_from_stack(&stack, 5, 1),
            Err(Error::BandIndex { requested: 5, .. })
        ));
    }

    #[test]
    fn test_water_indices() {
        let green = make_band(1, 1, &[0.3]);
        let nir = make_band(1, 1, &[0.1]);
        assert!(ndwi(&green, &nir).unwrap().get(0, 0).unwrap() > 0.0);
        assert!(gndvi(&nir, &green).unwrap().get(0, 0).unwrap() < 0.0);
        assert_eq!(SpectralIndex::MNDWI.band_roles(), ("green", "swir"));
    }

    #[test]
    fn test_algorithm_trait() {
        let nir = make_band(1, 1, &[0.6]);
        let swir = make_band(1, 1, &[0.2]);
        let algo = NormalizedDifference(SpectralIndex::NBR);
        assert_eq!(algo.name(), "NBR");
        let out = algo.execute_default((nir, swir)).unwrap();
        assert!((out.get(0, 0).unwrap() - 0.5).abs() < 1e-12);
    }
}
