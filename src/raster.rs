use std::path::Path;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;

use crate::error::Result;
use crate::extent::Extent;

pub struct RasterSpec<'a> {
    pub path: &'a Path,
    pub width: usize,
    pub height: usize,
    pub geo_transform: [f64; 6],
    /// WKT
    pub srs: Option<&'a str>,
    pub no_data: f64,
}

/// Writes single band f64 rasters.
pub trait RasterWriter: Sync {
    /// `band` is row-major, `width * height` values, north row first.
    fn write(&self, spec: &RasterSpec<'_>, band: Vec<f64>) -> Result<()>;
}

/// Pixel to world transform with the origin on the top left corner of `bounds`.
pub fn north_up_transform(bounds: &Extent, res: f64) -> [f64; 6] {
    [bounds.min_x, res, 0.0, bounds.max_y, 0.0, -res]
}

pub struct GeoTiffWriter;

impl RasterWriter for GeoTiffWriter {
    fn write(&self, spec: &RasterSpec<'_>, band: Vec<f64>) -> Result<()> {
        let size = (spec.width, spec.height);

        let mut ds = DriverManager::get_driver_by_name("GTiff")?
            .create_with_band_type::<f64, _>(spec.path, spec.width, spec.height, 1)?;

        ds.set_geo_transform(&spec.geo_transform)?;
        if let Some(wkt) = spec.srs {
            ds.set_spatial_ref(&SpatialRef::from_wkt(wkt)?)?;
        }

        {
            let mut rb = ds.rasterband(1)?;
            rb.set_no_data_value(Some(spec.no_data))?;
            rb.write((0, 0), size, &mut Buffer::new(size, band))?;
        }

        ds.flush_cache()?;
        Ok(())
    }
}
