//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Reads chunky (pixel-interleaved) gray, RGB, RGBA
//! and CMYK images with their ModelPixelScale/ModelTiepoint or
//! ModelTransformation transform, GeoKeyDirectory EPSG code and GDAL_NODATA
//! tag. Writes single-band images with the same tags.
//! For other layouts and formats, enable the `gdal` feature.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::options::{encode_cells, DataType, GeoTiffOptions};
use crate::raster::{GeoTransform, Raster, RasterElement, RasterMetadata, RasterStack};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKindStandard, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType as SampleLayout;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn memory_origin() -> PathBuf {
    PathBuf::from("<memory>")
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(File::open(path)?)
}

/// Read one band (1-indexed, default 1) of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = open(path)?;
    select_band(decode_geotiff(file, path)?, band)
}

/// Read one band of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    select_band(decode_geotiff(Cursor::new(data), &memory_origin())?, band)
}

/// Read every band of a GeoTIFF file
pub fn read_stack<T, P>(path: P) -> Result<RasterStack<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = open(path)?;
    decode_geotiff(file, path)
}

/// Read every band of a GeoTIFF held in memory
pub fn read_stack_from_buffer<T>(data: &[u8]) -> Result<RasterStack<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), &memory_origin())
}

/// Read grid metadata without decoding pixel data
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<RasterMetadata> {
    let path = path.as_ref();
    let file = open(path)?;
    let mut decoder = Decoder::new(file).map_err(|e| Error::format(path, e))?;

    let (width, height) = decoder.dimensions().map_err(|e| Error::format(path, e))?;
    let layout = decoder.colortype().map_err(|e| Error::format(path, e))?;
    let band_count = samples_per_pixel(layout, path)?;
    let tags = read_geo_tags(&mut decoder);

    let (rows, cols) = (height as usize, width as usize);
    Ok(RasterMetadata {
        rows,
        cols,
        band_count,
        transform: tags.transform,
        resolution: tags.transform.resolution(),
        extent: tags.transform.extent(cols, rows),
        crs: tags.crs,
        nodata: tags.nodata,
    })
}

fn select_band<T: RasterElement>(stack: RasterStack<T>, band: Option<usize>) -> Result<Raster<T>> {
    let index = band.unwrap_or(1);
    stack.band(index).cloned()
}

fn samples_per_pixel(layout: SampleLayout, origin: &Path) -> Result<usize> {
    match layout {
        SampleLayout::Gray(_) => Ok(1),
        SampleLayout::GrayA(_) => Ok(2),
        SampleLayout::RGB(_) => Ok(3),
        SampleLayout::RGBA(_) | SampleLayout::CMYK(_) => Ok(4),
        other => Err(Error::format(
            origin,
            format!("unsupported sample layout {:?}", other),
        )),
    }
}

fn cast_samples<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Internal: decode every band of a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R, origin: &Path) -> Result<RasterStack<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(|e| Error::format(origin, e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::format(origin, format!("cannot read dimensions: {}", e)))?;
    let layout = decoder.colortype().map_err(|e| Error::format(origin, e))?;
    let samples = samples_per_pixel(layout, origin)?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::format(origin, format!("cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_samples(buf),
        DecodingResult::U16(buf) => cast_samples(buf),
        DecodingResult::U32(buf) => cast_samples(buf),
        DecodingResult::U64(buf) => cast_samples(buf),
        DecodingResult::I8(buf) => cast_samples(buf),
        DecodingResult::I16(buf) => cast_samples(buf),
        DecodingResult::I32(buf) => cast_samples(buf),
        DecodingResult::I64(buf) => cast_samples(buf),
        DecodingResult::F32(buf) => cast_samples(buf),
        DecodingResult::F64(buf) => cast_samples(buf),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(format!(
                "{} sample format",
                origin.display()
            )))
        }
    };

    if data.len() != rows * cols * samples {
        return Err(Error::format(
            origin,
            format!(
                "expected {} samples for {}x{}x{}, found {}",
                rows * cols * samples,
                rows,
                cols,
                samples,
                data.len()
            ),
        ));
    }

    let tags = read_geo_tags(&mut decoder);
    let nodata: Option<T> = tags.nodata.and_then(T::from_f64);

    let mut bands = Vec::with_capacity(samples);
    for b in 0..samples {
        let values: Vec<T> = data.iter().skip(b).step_by(samples).copied().collect();
        let mut raster = Raster::from_vec(values, rows, cols)?;
        raster.set_transform(tags.transform);
        raster.set_crs(tags.crs.clone());
        raster.set_nodata(nodata);
        bands.push(raster);
    }

    Ok(RasterStack::new(bands)?.with_source(origin))
}

struct GeoTags {
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<f64>,
}

fn read_geo_tags<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoTags {
    GeoTags {
        transform: read_geotransform(decoder).unwrap_or_default(),
        crs: read_crs(decoder),
        nodata: read_nodata(decoder),
    }
}

/// GeoTransform from ModelTransformation, or else ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(tag(MODEL_TRANSFORMATION)) {
        if m.len() >= 8 {
            // Row-major 4x4: x = m0*col + m1*row + m3, y = m4*col + m5*row + m7
            return Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from ProjectedCSTypeGeoKey or GeographicTypeGeoKey
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY)).ok()?;
    if keys.len() < 4 {
        return None;
    }

    let num_keys = keys[3] as usize;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // location 0: value stored inline
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE_KEY => return Some(CRS::from_epsg(value as u32)),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(CRS::from_epsg(value as u32)),
            _ => {}
        }
    }
    geographic
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(tag(GDAL_NODATA)).ok()?;
    text.trim_end_matches('\0').trim().parse::<f64>().ok()
}

/// Write a Raster to a single-band GeoTIFF file
///
/// Compression and tiling options are ignored by the native writer.
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    opts.validate()?;
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file, &opts)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let opts = options.unwrap_or_default();
    opts.validate()?;
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &opts)?;
    Ok(buf)
}

fn encode_error(e: impl std::fmt::Display) -> Error {
    Error::Other(format!("TIFF encode error: {}", e))
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, opts: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(encode_error)?;
    let (rows, cols) = raster.shape();
    let (w, h) = (cols as u32, rows as u32);
    let cells = encode_cells(raster, opts);

    // Values are already clamped to the target range by `encode_cells`
    match opts.datatype {
        DataType::UInt8 => {
            let data: Vec<u8> = cells.iter().map(|&v| v as u8).collect();
            write_image::<colortype::Gray8, _, _>(&mut encoder, w, h, &data, raster, opts)
        }
        DataType::Int16 => {
            let data: Vec<i16> = cells.iter().map(|&v| v as i16).collect();
            write_image::<colortype::GrayI16, _, _>(&mut encoder, w, h, &data, raster, opts)
        }
        DataType::Int32 => {
            let data: Vec<i32> = cells.iter().map(|&v| v as i32).collect();
            write_image::<colortype::GrayI32, _, _>(&mut encoder, w, h, &data, raster, opts)
        }
        DataType::Float32 => {
            let data: Vec<f32> = cells.iter().map(|&v| v as f32).collect();
            write_image::<colortype::Gray32Float, _, _>(&mut encoder, w, h, &data, raster, opts)
        }
        DataType::Float64 => {
            write_image::<colortype::Gray64Float, _, _>(&mut encoder, w, h, &cells, raster, opts)
        }
    }
}

fn write_image<C, W, T>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    raster: &Raster<T>,
    opts: &GeoTiffOptions,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
    T: RasterElement,
{
    let mut image = encoder.new_image::<C>(width, height).map_err(encode_error)?;
    write_geo_tags(image.encoder(), raster, opts)?;
    image.write_data(data).map_err(encode_error)?;
    Ok(())
}

fn write_geo_tags<W, T>(
    dir: &mut DirectoryEncoder<'_, W, TiffKindStandard>,
    raster: &Raster<T>,
    opts: &GeoTiffOptions,
) -> Result<()>
where
    W: Write + Seek,
    T: RasterElement,
{
    let gt = raster.transform();

    if gt.is_north_up() && gt.pixel_width > 0.0 {
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        dir.write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])
            .map_err(encode_error)?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        dir.write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])
            .map_err(encode_error)?;
    } else {
        // Rotated, flipped or south-up grids need the full affine
        #[rustfmt::skip]
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(tag(MODEL_TRANSFORMATION), &matrix[..])
            .map_err(encode_error)?;
    }

    dir.write_tag(tag(GEO_KEY_DIRECTORY), &geo_keys(raster.crs())[..])
        .map_err(encode_error)?;

    let nodata = opts.datatype.nodata();
    let nodata_text = if nodata.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", nodata)
    };
    dir.write_tag(tag(GDAL_NODATA), nodata_text.as_str())
        .map_err(encode_error)?;

    Ok(())
}

/// GeoKeyDirectory entries: model type, raster type (PixelIsArea) and the
/// EPSG code when known. Codes 4000-4999 are treated as geographic.
fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs
        .and_then(CRS::epsg)
        .and_then(|code| u16::try_from(code).ok());
    let geographic = matches!(epsg, Some(4000..=4999));

    let mut keys: Vec<u16> = vec![1, 1, 0, 0];
    keys.extend_from_slice(&[GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 }]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_KEY, 0, 1, 1]);
    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }
    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::options::DataType;

    fn ndvi_like() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.6, 0.6, -0.25, f64::NAN], 2, 2).unwrap();
        r.set_transform(GeoTransform::new(600_000.0, 4_100_000.0, 30.0, -30.0));
        r.set_crs(Some(CRS::utm_north(17)));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_buffer_roundtrip_keeps_georeferencing() {
        let raster = ndvi_like();
        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let loaded: Raster<f64> = read_geotiff_from_buffer(&bytes, None).unwrap();

        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(loaded.transform(), raster.transform());
        assert_eq!(loaded.crs().and_then(CRS::epsg), Some(32617));
        assert!((loaded.get(0, 0).unwrap() - 0.6).abs() < 1e-6);
        assert!(loaded.get(1, 1).unwrap().is_nan());
        assert!(loaded.is_nodata_at(1, 1).unwrap());
    }

    #[test]
    fn test_scaled_int16_roundtrip() {
        let raster = ndvi_like();
        let opts = GeoTiffOptions::scaled(DataType::Int16, 10000.0);
        let bytes = write_geotiff_to_buffer(&raster, Some(opts)).unwrap();

        let loaded: Raster<i16> = read_geotiff_from_buffer(&bytes, None).unwrap();
        assert_eq!(loaded.get(0, 0).unwrap(), 6000);
        assert_eq!(loaded.get(1, 0).unwrap(), -2500);
        assert_eq!(loaded.nodata(), Some(i16::MIN));
        assert!(loaded.is_nodata_at(1, 1).unwrap());
    }

    #[test]
    fn test_band_index_out_of_range() {
        let bytes = write_geotiff_to_buffer(&ndvi_like(), None).unwrap();
        let result = read_geotiff_from_buffer::<f64>(&bytes, Some(2));
        assert!(matches!(
            result,
            Err(Error::BandIndex { requested: 2, band_count: 1, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = read_geotiff::<f64, _>("/nonexistent/scene.tif", None);
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
        assert!(matches!(
            read_metadata("/nonexistent/scene.tif"),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_buffer_is_format_error() {
        let result = read_stack_from_buffer::<f64>(b"definitely not a tiff");
        assert!(matches!(result, Err(Error::Format { .. })));
    }

    #[test]
    fn test_multiband_deinterleave() {
        // 2x2 RGB image, pixel-interleaved
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            let data: Vec<u8> = vec![
                10, 20, 30, 11, 21, 31, //
                12, 22, 32, 13, 23, 33,
            ];
            encoder
                .write_image::<colortype::RGB8>(2, 2, &data)
                .unwrap();
        }

        let stack: RasterStack<f64> = read_stack_from_buffer(&buf).unwrap();
        assert_eq!(stack.band_count(), 3);
        assert_eq!(stack.band(1).unwrap().to_vec(), vec![10.0, 11.0, 12.0, 13.0]);
        assert_eq!(stack.band(3).unwrap().to_vec(), vec![30.0, 31.0, 32.0, 33.0]);
    }

    #[test]
    fn test_metadata_from_file() {
        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&ndvi_like(), tmp.path(), None).unwrap();

        let meta = read_metadata(tmp.path()).unwrap();
        assert_eq!((meta.rows, meta.cols, meta.band_count), (2, 2, 1));
        assert_eq!(meta.resolution, (30.0, 30.0));
        assert_eq!(meta.crs, Some(CRS::utm_north(17)));
        assert!(meta.nodata.unwrap().is_nan());
    }

    #[test]
    fn test_south_up_and_rotated_transforms_survive() {
        let south_up = GeoTransform::new(0.0, 0.0, 10.0, 10.0);
        let rotated = GeoTransform::from_gdal([0.0, 10.0, 2.0, 0.0, 2.0, -10.0]);

        for gt in [south_up, rotated] {
            let mut raster = ndvi_like();
            raster.set_transform(gt);
            let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
            let loaded: Raster<f64> = read_geotiff_from_buffer(&bytes, None).unwrap();

            assert_eq!(loaded.transform(), &gt);
            assert!(crate::raster::compare_rasters(&raster, &loaded).is_compatible());
        }
    }

    #[test]
    fn test_user_defined_projection_is_not_epsg() {
        let keys: Vec<u16> = vec![
            1, 1, 0, 2, //
            PROJECTED_CS_TYPE_KEY, 0, 1, USER_DEFINED, //
            GEOGRAPHIC_TYPE_KEY, 0, 1, 4326,
        ];
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            let mut image = encoder.new_image::<colortype::Gray8>(1, 1).unwrap();
            image
                .encoder()
                .write_tag(tag(GEO_KEY_DIRECTORY), &keys[..])
                .unwrap();
            image.write_data(&[7u8]).unwrap();
        }

        let loaded: Raster<f64> = read_geotiff_from_buffer(&buf, None).unwrap();
        assert_eq!(loaded.crs().and_then(CRS::epsg), Some(4326));
    }

    #[test]
    fn test_geo_keys_geographic() {
        let keys = geo_keys(Some(&CRS::wgs84()));
        assert_eq!(keys[3], 3);
        assert_eq!(&keys[4..8], &[GT_MODEL_TYPE_KEY, 0, 1, 2]);
        assert_eq!(&keys[12..16], &[GEOGRAPHIC_TYPE_KEY, 0, 1, 4326]);
        assert_eq!(geo_keys(None)[3], 2);
    }
}
