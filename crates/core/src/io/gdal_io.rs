//! GeoTIFF reading and writing using GDAL

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::options::{encode_cells, DataType, GeoTiffOptions};
use crate::raster::{GeoTransform, Raster, RasterElement, RasterMetadata, RasterStack};
use gdal::raster::{Buffer, GdalType, RasterCreationOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use std::path::Path;

fn open(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Dataset::open(path).map_err(|e| Error::format(path, e))
}

fn dataset_crs(dataset: &Dataset) -> Option<CRS> {
    let srs = dataset.spatial_ref().ok()?;
    let wkt = srs.to_wkt().ok()?;
    let crs = CRS::from_wkt(wkt);
    Some(match srs.auth_code() {
        Ok(code) if code > 0 => crs.with_epsg(code as u32),
        _ => crs,
    })
}

fn read_band<T: RasterElement + GdalType>(
    dataset: &Dataset,
    path: &Path,
    index: usize,
) -> Result<Raster<T>> {
    let band_count = dataset.raster_count();
    if index == 0 || index > band_count {
        return Err(Error::BandIndex {
            path: path.to_path_buf(),
            requested: index,
            band_count,
        });
    }

    let rasterband = dataset.rasterband(index)?;
    let (cols, rows) = dataset.raster_size();
    let buffer = rasterband
        .read_as::<T>((0, 0), (cols, rows), (cols, rows), None)
        .map_err(|e| Error::format(path, e))?;

    let mut raster = Raster::from_vec(buffer.data().to_vec(), rows, cols)?;
    if let Ok(gt) = dataset.geo_transform() {
        raster.set_transform(GeoTransform::from_gdal(gt));
    }
    raster.set_crs(dataset_crs(dataset));
    if let Some(nodata) = rasterband.no_data_value() {
        raster.set_nodata(T::from_f64(nodata));
    }
    Ok(raster)
}

/// Read one band (1-indexed, default 1) of a raster file
///
/// # Example
/// ```ignore
/// let red: Raster<f64> = read_geotiff("landsat.tif", Some(3))?;
/// ```
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let dataset = open(path)?;
    read_band(&dataset, path, band.unwrap_or(1))
}

/// Read every band of a raster file
pub fn read_stack<T, P>(path: P) -> Result<RasterStack<T>>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let dataset = open(path)?;
    let bands = (1..=dataset.raster_count())
        .map(|i| read_band(&dataset, path, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(RasterStack::new(bands)?.with_source(path))
}

/// Read grid metadata without reading pixel data
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<RasterMetadata> {
    let path = path.as_ref();
    let dataset = open(path)?;
    let (cols, rows) = dataset.raster_size();
    let transform = dataset
        .geo_transform()
        .map(GeoTransform::from_gdal)
        .unwrap_or_default();
    let nodata = dataset
        .rasterband(1)
        .ok()
        .and_then(|b| b.no_data_value());

    Ok(RasterMetadata {
        rows,
        cols,
        band_count: dataset.raster_count(),
        transform,
        resolution: transform.resolution(),
        extent: transform.extent(cols, rows),
        crs: dataset_crs(&dataset),
        nodata,
    })
}

/// Write a Raster to a single-band GeoTIFF file
///
/// # Arguments
/// * `raster` - The raster to write
/// * `path` - Output file path
/// * `options` - Encoding and creation options
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    opts.validate()?;
    let cells = encode_cells(raster, &opts);
    let path = path.as_ref();

    match opts.datatype {
        DataType::UInt8 => write_typed(raster, path, &opts, cells.iter().map(|&v| v as u8).collect()),
        DataType::Int16 => write_typed(raster, path, &opts, cells.iter().map(|&v| v as i16).collect()),
        DataType::Int32 => write_typed(raster, path, &opts, cells.iter().map(|&v| v as i32).collect()),
        DataType::Float32 => write_typed(raster, path, &opts, cells.iter().map(|&v| v as f32).collect()),
        DataType::Float64 => write_typed(raster, path, &opts, cells),
    }
}

fn creation_options(opts: &GeoTiffOptions) -> Result<RasterCreationOptions> {
    let mut create = RasterCreationOptions::new();
    create.set_name_value("COMPRESS", &opts.compression)?;
    if opts.tile_size > 0 {
        let size = opts.tile_size.to_string();
        create.set_name_value("TILED", "YES")?;
        create.set_name_value("BLOCKXSIZE", &size)?;
        create.set_name_value("BLOCKYSIZE", &size)?;
    }
    if opts.bigtiff {
        create.set_name_value("BIGTIFF", "YES")?;
    }
    Ok(create)
}

fn write_typed<S, T>(raster: &Raster<T>, path: &Path, opts: &GeoTiffOptions, data: Vec<S>) -> Result<()>
where
    S: GdalType + Copy,
    T: RasterElement,
{
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (rows, cols) = raster.shape();

    let mut dataset = driver.create_with_band_type_with_options::<S, _>(
        path,
        cols,
        rows,
        1,
        &creation_options(opts)?,
    )?;

    dataset.set_geo_transform(&raster.transform().to_gdal())?;

    if let Some(crs) = raster.crs() {
        let srs = match (crs.epsg(), crs.wkt()) {
            (Some(code), _) => Some(SpatialRef::from_epsg(code)?),
            (None, Some(wkt)) => Some(SpatialRef::from_wkt(wkt)?),
            (None, None) => crs.proj().map(SpatialRef::from_proj4).transpose()?,
        };
        if let Some(srs) = srs {
            dataset.set_spatial_ref(&srs)?;
        }
    }

    let mut band = dataset.rasterband(1)?;
    band.set_no_data_value(Some(opts.datatype.nodata()))?;

    let mut buffer = Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &mut buffer)?;

    Ok(())
}
