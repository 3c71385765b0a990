//! Grid compatibility between bands
//!
//! Two bands can be combined pixel by pixel only when they describe the same
//! grid: identical dimensions, resolution, extent and CRS.

use crate::crs::CRS;
use crate::raster::{Extent, Raster, RasterElement};
use std::fmt;

/// A single attribute on which two rasters differ
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// (rows, cols)
    Dimensions {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// (x, y) cell size
    Resolution { left: (f64, f64), right: (f64, f64) },
    Extent { left: Extent, right: Extent },
    Crs {
        left: Option<CRS>,
        right: Option<CRS>,
    },
}

impl Mismatch {
    /// Attribute name, e.g. `"resolution"`
    pub fn attribute(&self) -> &'static str {
        match self {
            Mismatch::Dimensions { .. } => "dimensions",
            Mismatch::Resolution { .. } => "resolution",
            Mismatch::Extent { .. } => "extent",
            Mismatch::Crs { .. } => "crs",
        }
    }

    fn swapped(self) -> Self {
        match self {
            Mismatch::Dimensions { left, right } => Mismatch::Dimensions { left: right, right: left },
            Mismatch::Resolution { left, right } => Mismatch::Resolution { left: right, right: left },
            Mismatch::Extent { left, right } => Mismatch::Extent { left: right, right: left },
            Mismatch::Crs { left, right } => Mismatch::Crs { left: right, right: left },
        }
    }
}

fn crs_label(crs: &Option<CRS>) -> String {
    crs.as_ref()
        .map_or_else(|| "none".to_string(), CRS::identifier)
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Dimensions { left, right } => write!(
                f,
                "dimensions {}x{} vs {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Mismatch::Resolution { left, right } => write!(
                f,
                "resolution {}x{} vs {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Mismatch::Extent { left, right } => write!(f, "extent {} vs {}", left, right),
            Mismatch::Crs { left, right } => {
                write!(f, "crs {} vs {}", crs_label(left), crs_label(right))
            }
        }
    }
}

/// The attributes two rasters differ on, in check order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mismatches(pub Vec<Mismatch>);

impl fmt::Display for Mismatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}

/// Outcome of [`compare_rasters`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compatibility {
    mismatches: Mismatches,
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        self.mismatches.0.is_empty()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches.0
    }

    pub fn into_mismatches(self) -> Mismatches {
        self.mismatches
    }

    /// The same comparison seen from the other raster
    pub fn reversed(self) -> Self {
        Self {
            mismatches: Mismatches(self.mismatches.0.into_iter().map(Mismatch::swapped).collect()),
        }
    }
}

/// Compare the grids of two rasters.
///
/// Dimensions, resolution and extent must be exactly equal; CRS must be
/// equivalent or absent on both sides. Data types may differ.
///
/// ```ignore
/// let check = compare_rasters(&nir, &red);
/// if !check.is_compatible() {
///     for m in check.mismatches() {
///         eprintln!("{}", m);
///     }
/// }
/// ```
pub fn compare_rasters<A, B>(a: &Raster<A>, b: &Raster<B>) -> Compatibility
where
    A: RasterElement,
    B: RasterElement,
{
    let mut found = Vec::new();

    if a.shape() != b.shape() {
        found.push(Mismatch::Dimensions {
            left: a.shape(),
            right: b.shape(),
        });
    }

    if a.resolution() != b.resolution() {
        found.push(Mismatch::Resolution {
            left: a.resolution(),
            right: b.resolution(),
        });
    }

    let (ea, eb) = (a.extent(), b.extent());
    if ea != eb {
        found.push(Mismatch::Extent { left: ea, right: eb });
    }

    let same_crs = match (a.crs(), b.crs()) {
        (None, None) => true,
        (Some(x), Some(y)) => x.is_equivalent(y),
        _ => false,
    };
    if !same_crs {
        found.push(Mismatch::Crs {
            left: a.crs().cloned(),
            right: b.crs().cloned(),
        });
    }

    Compatibility {
        mismatches: Mismatches(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn band(rows: usize, cols: usize, cell: f64) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(300_000.0, 5_000_000.0, cell, -cell));
        r.set_crs(Some(CRS::utm_north(32)));
        r
    }

    #[test]
    fn test_reflexive() {
        let a = band(10, 10, 30.0);
        assert!(compare_rasters(&a, &a).is_compatible());
    }

    #[test]
    fn test_symmetric() {
        let a = band(10, 10, 30.0);
        let b = band(10, 10, 10.0);

        let ab = compare_rasters(&a, &b);
        let ba = compare_rasters(&b, &a);
        assert_eq!(ab.is_compatible(), ba.is_compatible());
        assert_eq!(ab.reversed(), ba);
    }

    #[test]
    fn test_resolution_change_names_both_attributes() {
        let a = band(10, 10, 30.0);
        let b = band(10, 10, 10.0);

        let check = compare_rasters(&a, &b);
        let attrs: Vec<_> = check.mismatches().iter().map(Mismatch::attribute).collect();
        assert_eq!(attrs, vec!["resolution", "extent"]);
    }

    #[test]
    fn test_crs_mismatch() {
        let a = band(4, 4, 30.0);
        let mut b = a.clone();
        b.set_crs(Some(CRS::utm_north(33)));
        let mut c = a.clone();
        c.set_crs(None);

        let check = compare_rasters(&a, &b);
        assert_eq!(check.mismatches().len(), 1);
        assert_eq!(check.mismatches()[0].attribute(), "crs");
        assert!(check.into_mismatches().to_string().contains("EPSG:32633"));
        assert!(!compare_rasters(&a, &c).is_compatible());
    }

    #[test]
    fn test_dimensions_reported() {
        let a = band(4, 4, 30.0);
        let b = band(4, 5, 30.0);
        let check = compare_rasters(&a, &b);
        assert_eq!(
            check.mismatches()[0],
            Mismatch::Dimensions {
                left: (4, 4),
                right: (4, 5)
            }
        );
    }

    #[test]
    fn test_element_types_may_differ() {
        let a = band(3, 3, 30.0);
        let labels = a.with_data(vec![1_i32; 9], Some(0)).unwrap();
        assert!(compare_rasters(&a, &labels).is_compatible());
    }
}
