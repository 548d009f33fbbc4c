//! USGS 3D Elevation Program (3DEP) seamless DEM.
//!
//! Images are cut server-side by the 3DEP ImageServer `exportImage`
//! operation, which also reprojects when asked for EPSG:5070 (CONUS Albers).
//!
//! Source: https://elevation.nationalmap.gov/arcgis/rest/services/3DEPElevation/ImageServer

use crate::http::{client, ensure_tiff, fetch_bytes};
use crate::raster::{DataType, Raster};
use crate::{BBox, DemError, Result};
use std::io::Cursor;
use std::path::Path;
use tracing::info;

const EXPORT_IMAGE_URL: &str =
    "https://elevation.nationalmap.gov/arcgis/rest/services/3DEPElevation/ImageServer/exportImage";

/// Largest image side the ImageServer returns in one request.
const MAX_EXPORT_SIZE: usize = 8000;

/// Resolutions (metres) with a seamless 3DEP product.
pub const THREEDEP_RESOLUTIONS: [u32; 3] = [10, 30, 60];

/// CONUS Albers Equal Area.
pub const EPSG_CONUS_ALBERS: u16 = 5070;

const EPSG_WGS84: u16 = 4326;

/// Parameters of a single `exportImage` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub bbox: BBox,
    pub out_epsg: u16,
    pub width: usize,
    pub height: usize,
}

impl ExportRequest {
    /// Size the request so output pixels are roughly `resolution` metres.
    pub fn new(bbox: &BBox, resolution: u32, to_5070: bool) -> Result<Self> {
        let (width_m, height_m) = bbox.size_meters();
        let width = ((width_m / resolution as f64).ceil() as usize).max(1);
        let height = ((height_m / resolution as f64).ceil() as usize).max(1);
        if width > MAX_EXPORT_SIZE || height > MAX_EXPORT_SIZE {
            return Err(DemError::RequestTooLarge {
                width,
                height,
                max: MAX_EXPORT_SIZE,
            });
        }
        Ok(Self {
            bbox: *bbox,
            out_epsg: if to_5070 { EPSG_CONUS_ALBERS } else { EPSG_WGS84 },
            width,
            height,
        })
    }

    /// Query string pairs for the ImageServer.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let b = &self.bbox;
        vec![
            ("bbox", format!("{},{},{},{}", b.west, b.south, b.east, b.north)),
            ("bboxSR", EPSG_WGS84.to_string()),
            ("imageSR", self.out_epsg.to_string()),
            ("size", format!("{},{}", self.width, self.height)),
            ("format", "tiff".to_string()),
            ("pixelType", "F32".to_string()),
            ("noDataInterpretation", "esriNoDataMatchAny".to_string()),
            ("interpolation", "RSP_BilinearInterpolation".to_string()),
            ("f", "image".to_string()),
        ]
    }
}

/// Get a DEM from the USGS 3DEP seamless product and save it as GeoTIFF.
///
/// # Arguments
/// * `bbox` - (west, south, east, north) in decimal degrees
/// * `tif_path` - Output GeoTIFF path
/// * `resolution` - Pixel size in metres: 10, 30 or 60
/// * `to_5070` - Reproject to EPSG:5070 instead of keeping EPSG:4326
///
/// Cells at or below the service nodata value are written as NaN.
pub fn get_3dep<B, P>(bbox: B, tif_path: P, resolution: u32, to_5070: bool) -> Result<()>
where
    B: Into<BBox>,
    P: AsRef<Path>,
{
    let bbox = bbox.into();
    if !THREEDEP_RESOLUTIONS.contains(&resolution) {
        return Err(DemError::InvalidResolution(resolution));
    }
    bbox.validate()?;

    let request = ExportRequest::new(&bbox, resolution, to_5070)?;
    info!(
        "Requesting 3DEP {}m DEM for {} ({}x{} pixels, EPSG:{})",
        resolution, bbox, request.width, request.height, request.out_epsg
    );

    let client = client()?;
    let bytes = fetch_bytes(
        client.get(EXPORT_IMAGE_URL).query(&request.query()),
        EXPORT_IMAGE_URL,
    )?;
    ensure_tiff(&bytes, EXPORT_IMAGE_URL)?;

    let mut dem = Raster::from_reader(Cursor::new(bytes))?;
    if dem.crs().is_none() {
        dem.set_crs(Some(request.out_epsg));
    }
    mask_below_nodata(&mut dem);
    dem.metadata_mut()
        .insert("units".to_string(), "meters".to_string());
    dem.metadata_mut()
        .insert("vertical_datum".to_string(), "NAVD88".to_string());
    dem.metadata_mut()
        .insert("long_name".to_string(), "elevation".to_string());

    dem.write(tif_path.as_ref(), DataType::F32)?;
    info!("Saved 3DEP DEM to {}", tif_path.as_ref().display());
    Ok(())
}

/// Replace values at or below the nodata marker with NaN and make NaN the
/// new nodata value.
fn mask_below_nodata(dem: &mut Raster) {
    if let Some(nodata) = dem.nodata().filter(|v| !v.is_nan()) {
        for v in dem.data_mut() {
            if *v <= nodata {
                *v = f64::NAN;
            }
        }
    }
    dem.set_nodata(Some(f64::NAN));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoTransform;

    #[test]
    fn test_wrong_resolution() {
        let bbox = (-95.20, 29.70, -95.201, 29.701);
        let dir = tempfile::tempdir().unwrap();
        let err = get_3dep(bbox, dir.path().join("3dep.tif"), 29, true).unwrap_err();
        assert_eq!(err.to_string(), "Resolution must be one of 10, 30, or 60 meters.");
        assert!(!dir.path().join("3dep.tif").exists());
    }

    #[test]
    fn test_invalid_bbox_rejected_before_download() {
        let bbox = (-95.20, 29.70, -95.201, 29.701);
        let err = get_3dep(bbox, "unused.tif", 30, false).unwrap_err();
        assert!(matches!(err, DemError::InvalidBbox(_)));
    }

    #[test]
    fn test_export_request() {
        let bbox = BBox::from((-95.3, 29.6, -95.2, 29.7));
        let request = ExportRequest::new(&bbox, 30, true).unwrap();
        assert_eq!(request.out_epsg, EPSG_CONUS_ALBERS);
        assert_eq!(request.height, 372);
        assert!(request.width > 320 && request.width < 330);

        let query = request.query();
        assert!(query.contains(&("bbox", "-95.3,29.6,-95.2,29.7".to_string())));
        assert!(query.contains(&("imageSR", "5070".to_string())));
        assert!(query.contains(&("bboxSR", "4326".to_string())));

        let huge = BBox::from((-100.0, 30.0, -90.0, 40.0));
        assert!(matches!(
            ExportRequest::new(&huge, 10, false),
            Err(DemError::RequestTooLarge { .. })
        ));
    }

    #[test]
    fn test_mask_below_nodata() {
        let transform = GeoTransform {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
        };
        let mut dem = Raster::new(3, 1, transform, 0.0);
        dem.data_mut().copy_from_slice(&[12.5, -3.4e38, -3.5e38]);
        dem.set_nodata(Some(-3.4e38));
        mask_below_nodata(&mut dem);
        assert_eq!(dem.data()[0], 12.5);
        assert!(dem.data()[1].is_nan() && dem.data()[2].is_nan());
        assert!(dem.nodata().unwrap().is_nan());
    }
}
