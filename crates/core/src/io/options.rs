//! Export encoding options shared by both GeoTIFF backends

use crate::error::{Error, Result};
use crate::raster::{Raster, RasterElement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sample type of an exported band.
///
/// Integer types reserve one value as the no-data sentinel; encoded values
/// are clamped to the remaining range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    UInt8,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    /// Sentinel written for no-data cells
    pub fn nodata(&self) -> f64 {
        match self {
            DataType::UInt8 => u8::MAX as f64,
            DataType::Int16 => i16::MIN as f64,
            DataType::Int32 => i32::MIN as f64,
            DataType::Float32 | DataType::Float64 => f64::NAN,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::UInt8 | DataType::Int16 | DataType::Int32)
    }

    /// Range valid cells are clamped to
    fn valid_range(&self) -> (f64, f64) {
        match self {
            DataType::UInt8 => (0.0, (u8::MAX - 1) as f64),
            DataType::Int16 => ((i16::MIN + 1) as f64, i16::MAX as f64),
            DataType::Int32 => ((i32::MIN + 1) as f64, i32::MAX as f64),
            DataType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Stored value for one cell: the sentinel for no-data, otherwise
    /// `value * scale`, rounded for integer types.
    pub fn encode(&self, value: f64, nodata: bool, scale: f64) -> f64 {
        if nodata || !value.is_finite() {
            return self.nodata();
        }
        let (lo, hi) = self.valid_range();
        let v = value * scale;
        if self.is_integer() {
            v.round().clamp(lo, hi)
        } else {
            v.clamp(lo, hi)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "uint8" | "u8" | "byte" => Ok(DataType::UInt8),
            "int16" | "i16" | "int2s" => Ok(DataType::Int16),
            "int32" | "i32" | "int4s" => Ok(DataType::Int32),
            "float32" | "f32" | "flt4s" => Ok(DataType::Float32),
            "float64" | "f64" | "flt8s" => Ok(DataType::Float64),
            _ => Err(Error::invalid_parameter(
                "datatype",
                s,
                "expected uint8, int16, int32, float32 or float64",
            )),
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression: "DEFLATE", "LZW", "ZSTD", "NONE" (GDAL backend only)
    pub compression: String,
    /// Tile size for tiled TIFFs, 0 for strips (GDAL backend only)
    pub tile_size: usize,
    /// BigTIFF for files > 4GB (GDAL backend only)
    pub bigtiff: bool,
    /// Stored sample type
    pub datatype: DataType,
    /// Multiplier applied before encoding, e.g. 10000 for NDVI as Int16
    pub scale: f64,
}

impl GeoTiffOptions {
    /// Scaled-integer export: `round(value * scale)` stored as `datatype`
    pub fn scaled(datatype: DataType, scale: f64) -> Self {
        Self {
            datatype,
            scale,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(Error::invalid_parameter(
                "scale",
                self.scale,
                "must be finite and non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "DEFLATE".to_string(),
            tile_size: 256,
            bigtiff: false,
            datatype: DataType::Float32,
            scale: 1.0,
        }
    }
}

/// Encode every cell of a raster (row-major) for the chosen sample type
pub(crate) fn encode_cells<T: RasterElement>(raster: &Raster<T>, opts: &GeoTiffOptions) -> Vec<f64> {
    raster
        .data()
        .iter()
        .map(|&v| {
            let nodata = raster.is_nodata(v);
            let value = v.to_f64().unwrap_or(f64::NAN);
            opts.datatype.encode(value, nodata, opts.scale)
        })
        .collect()
}

/// Invert a scaled-integer export: sentinel cells become `NaN`, others are
/// divided by `scale`.
pub fn unscale(raster: &Raster<f64>, scale: f64) -> Result<Raster<f64>> {
    if !scale.is_finite() || scale == 0.0 {
        return Err(Error::invalid_parameter("scale", scale, "must be finite and non-zero"));
    }
    let data = raster
        .data()
        .iter()
        .map(|&v| if raster.is_nodata(v) { f64::NAN } else { v / scale })
        .collect();
    raster.with_data(data, Some(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_int16_encoding() {
        let dt = DataType::Int16;
        assert_eq!(dt.encode(0.6, false, 10000.0), 6000.0);
        assert_eq!(dt.encode(-0.66667, false, 10000.0), -6667.0);
        assert_eq!(dt.encode(0.5, true, 10000.0), -32768.0);
        assert_eq!(dt.encode(f64::NAN, false, 10000.0), -32768.0);
        // Clamped away from the sentinel
        assert_eq!(dt.encode(-10.0, false, 10000.0), -32767.0);
    }

    #[test]
    fn test_uint8_reserves_max() {
        assert_eq!(DataType::UInt8.encode(400.0, false, 1.0), 254.0);
        assert_eq!(DataType::UInt8.nodata(), 255.0);
    }

    #[test]
    fn test_float_passthrough() {
        assert_eq!(DataType::Float32.encode(0.25, false, 1.0), 0.25);
        assert!(DataType::Float64.encode(0.25, true, 1.0).is_nan());
    }

    #[test]
    fn test_parse_datatype() {
        assert_eq!("INT2S".parse::<DataType>().unwrap(), DataType::Int16);
        assert_eq!("f32".parse::<DataType>().unwrap(), DataType::Float32);
        assert!("complex64".parse::<DataType>().is_err());
        assert_eq!(DataType::Int16.to_string(), "int16");
    }

    #[test]
    fn test_unscale() {
        let mut stored = Raster::from_vec(vec![6000.0, -32768.0], 1, 2).unwrap();
        stored.set_nodata(Some(-32768.0));

        let restored = unscale(&stored, 10000.0).unwrap();
        assert_eq!(restored.get(0, 0).unwrap(), 0.6);
        assert!(restored.get(0, 1).unwrap().is_nan());
        assert!(unscale(&stored, 0.0).is_err());
    }
}
