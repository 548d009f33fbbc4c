//! GeoTIFF to labelled 2-D array conversion.

use crate::raster::{DataType, Raster};
use crate::{DemError, Result};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::Path;

/// A single-band raster as a 2-D array with pixel-centre coordinates.
///
/// `data` is indexed `[row, col]` with row 0 at the northern edge; `y[row]`
/// and `x[col]` give the centre coordinates in the raster CRS.
#[derive(Debug, Clone)]
pub struct RasterArray {
    pub data: Array2<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub dtype: DataType,
    pub nodata: Option<f64>,
    pub crs: Option<u16>,
    pub attrs: BTreeMap<String, String>,
}

impl RasterArray {
    /// (rows, cols).
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Mean of all valid cells (NaN and nodata excluded).
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .data
            .iter()
            .filter(|v| !v.is_nan() && self.nodata.map_or(true, |nd| **v != nd))
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Read a single-band GeoTIFF into a [`RasterArray`].
///
/// # Arguments
/// * `dtype` - Cast values to this type; `None` keeps the file's type
/// * `name` - Stored in `attrs["name"]`
/// * `long_name` - Stored in `attrs["long_name"]`
/// * `nodata` - Override the file's nodata value
///
/// For floating types, nodata cells become NaN and NaN becomes the nodata value.
pub fn tif_to_array<P: AsRef<Path>>(
    tif_path: P,
    dtype: Option<DataType>,
    name: Option<&str>,
    long_name: Option<&str>,
    nodata: Option<f64>,
) -> Result<RasterArray> {
    let raster = Raster::read(tif_path)?;
    raster_to_array(raster, dtype, name, long_name, nodata)
}

fn raster_to_array(
    raster: Raster,
    dtype: Option<DataType>,
    name: Option<&str>,
    long_name: Option<&str>,
    nodata_override: Option<f64>,
) -> Result<RasterArray> {
    let (width, height) = (raster.width(), raster.height());
    let transform = *raster.transform();
    let crs = raster.crs();
    let mut attrs = raster.metadata().clone();
    let mut nodata = nodata_override.or(raster.nodata());
    let dtype = dtype.unwrap_or(raster.dtype());

    let mut values = raster.into_data();
    if dtype != DataType::F64 {
        for v in values.iter_mut() {
            *v = dtype.cast(*v);
        }
    }

    if dtype.is_float() {
        if let Some(nd) = nodata.filter(|v| !v.is_nan()) {
            let nd = dtype.cast(nd);
            for v in values.iter_mut() {
                if *v == nd {
                    *v = f64::NAN;
                }
            }
            nodata = Some(f64::NAN);
        }
    }

    if let Some(name) = name.filter(|s| !s.is_empty()) {
        attrs.insert("name".to_string(), name.to_string());
    }
    if let Some(long_name) = long_name.filter(|s| !s.is_empty()) {
        attrs.insert("long_name".to_string(), long_name.to_string());
    }

    let x = (0..width).map(|c| transform.pixel_center(c, 0).0).collect();
    let y = (0..height).map(|r| transform.pixel_center(0, r).1).collect();
    let data = Array2::from_shape_vec((height, width), values).map_err(|e| {
        DemError::InvalidGeoTiff(format!("pixel buffer does not match {width}x{height}: {e}"))
    })?;

    Ok(RasterArray {
        data,
        x,
        y,
        dtype,
        nodata,
        crs,
        attrs,
    })
}
