//! Ordered stacks of compatible bands

use crate::error::{Error, Result};
use crate::raster::{compare_rasters, Raster, RasterElement, RasterMetadata};
use std::path::PathBuf;

/// An ordered, non-empty collection of bands sharing one grid.
///
/// Channel order is the order the bands were given in. Bands are addressed
/// 1-based through [`RasterStack::band`] (as in raster files) and 0-based
/// through [`RasterStack::channel`].
///
/// # Example
///
/// ```ignore
/// // False-colour composite: NIR, red, green
/// let scene: RasterStack<f64> = read_stack("landsat.tif")?;
/// let composite = scene.select(&[4, 3, 2])?;
/// assert_eq!(composite.channel(0), Some(scene.band(4)?));
/// ```
#[derive(Debug, Clone)]
pub struct RasterStack<T: RasterElement> {
    bands: Vec<Raster<T>>,
    /// Where the bands were read from, used in error messages
    source: Option<PathBuf>,
}

impl<T: RasterElement> RasterStack<T> {
    /// Stack bands in the given order.
    ///
    /// Every band is checked against band 1; the first incompatible band is
    /// reported with all attributes it differs on.
    pub fn new(bands: Vec<Raster<T>>) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(Error::invalid_parameter(
                "bands",
                0,
                "a stack needs at least one band",
            ));
        };

        for (i, band) in bands.iter().enumerate().skip(1) {
            let check = compare_rasters(first, band);
            if !check.is_compatible() {
                return Err(Error::IncompatibleBands {
                    index: i + 1,
                    mismatches: check.into_mismatches(),
                });
            }
        }

        Ok(Self { bands, source: None })
    }

    /// Record the file the stack was loaded from
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// (rows, cols) shared by every band
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    /// Band by 1-based index
    pub fn band(&self, index: usize) -> Result<&Raster<T>> {
        if index == 0 || index > self.bands.len() {
            return Err(Error::BandIndex {
                path: self.source.clone().unwrap_or_else(|| PathBuf::from("<stack>")),
                requested: index,
                band_count: self.bands.len(),
            });
        }
        Ok(&self.bands[index - 1])
    }

    /// Channel by 0-based position
    pub fn channel(&self, position: usize) -> Option<&Raster<T>> {
        self.bands.get(position)
    }

    pub fn bands(&self) -> &[Raster<T>] {
        &self.bands
    }

    pub fn into_bands(self) -> Vec<Raster<T>> {
        self.bands
    }

    /// New stack from 1-based band indices, in the order given.
    ///
    /// Indices may repeat.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let bands = indices
            .iter()
            .map(|&i| self.band(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        let selected = Self::new(bands)?;
        Ok(Self {
            source: self.source.clone(),
            ..selected
        })
    }

    /// Grid metadata, with the stack's band count
    pub fn metadata(&self) -> RasterMetadata {
        RasterMetadata {
            band_count: self.bands.len(),
            ..self.bands[0].metadata()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CRS;
    use crate::raster::GeoTransform;

    fn band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(3, 4, value);
        r.set_transform(GeoTransform::new(0.0, 90.0, 30.0, -30.0));
        r.set_crs(Some(CRS::utm_north(18)));
        r
    }

    #[test]
    fn test_stack_preserves_order() {
        let (b2, b3, b4) = (band(0.2), band(0.3), band(0.4));
        let stack = RasterStack::new(vec![b4.clone(), b3, b2]).unwrap();

        assert_eq!(stack.band_count(), 3);
        assert_eq!(stack.channel(0).unwrap().data(), b4.data());
        assert_eq!(stack.band(1).unwrap().get(0, 0).unwrap(), 0.4);
        assert_eq!(stack.band(3).unwrap().get(0, 0).unwrap(), 0.2);
        assert!(stack.channel(3).is_none());
    }

    #[test]
    fn test_band_index_is_one_based() {
        let stack = RasterStack::new(vec![band(0.1), band(0.2)])
            .unwrap()
            .with_source("scene.tif");

        assert!(matches!(
            stack.band(0),
            Err(Error::BandIndex { requested: 0, band_count: 2, .. })
        ));
        match stack.band(3) {
            Err(Error::BandIndex { path, requested, .. }) => {
                assert_eq!(path, PathBuf::from("scene.tif"));
                assert_eq!(requested, 3);
            }
            other => panic!("expected BandIndex, got {:?}", other),
        }
    }

    #[test]
    fn test_incompatible_band_rejected() {
        let mut odd = band(0.5);
        odd.set_transform(GeoTransform::new(0.0, 90.0, 10.0, -10.0));

        match RasterStack::new(vec![band(0.1), band(0.2), odd]) {
            Err(Error::IncompatibleBands { index, mismatches }) => {
                assert_eq!(index, 3);
                assert_eq!(mismatches.0[0].attribute(), "resolution");
            }
            other => panic!("expected IncompatibleBands, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_stack_rejected() {
        let result = RasterStack::<f64>::new(Vec::new());
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_select_false_colour() {
        let stack = RasterStack::new(vec![band(0.1), band(0.2), band(0.3), band(0.4)]).unwrap();
        let composite = stack.select(&[4, 3, 2]).unwrap();

        let pixel: Vec<f64> = composite.bands().iter().map(|b| b.get(1, 1).unwrap()).collect();
        assert_eq!(pixel, vec![0.4, 0.3, 0.2]);
        assert_eq!(composite.metadata().band_count, 3);
        assert!(stack.select(&[4, 5]).is_err());
    }
}
