//! # wbt-dem
//!
//! DEM retrieval and GeoTIFF conversion helpers for WhiteboxTools workflows.
//!
//! ## Overview
//!
//! ### Downloading DEMs
//!
//! Two public elevation sources are supported:
//! - USGS 3DEP seamless DEM at 10, 30 or 60 m, cut and optionally reprojected
//!   to EPSG:5070 by the 3DEP ImageServer ([`get_3dep`])
//! - NASADEM (global, ~30 m) from Microsoft Planetary Computer, optionally
//!   resampled onto the UTM zone of the area ([`get_nasadem`])
//!
//! Both write a single-band GeoTIFF that WhiteboxTools can read directly.
//!
//! ### Reading results
//!
//! WhiteboxTools outputs are plain GeoTIFFs. [`tif_to_array`] loads one as an
//! [`ndarray`] with pixel-centre coordinates and [`tif_to_polygons`] turns a
//! classified raster (basins, streams) into polygons.
//!
//! GeoTIFF I/O is pure Rust (the `tiff` crate) and handles single-band
//! strip or tile images with GeoKeys, GDAL nodata and GDAL metadata tags.
//!
//! ## Examples
//!
//! ```no_run
//! use wbt_dem::{get_3dep, tif_to_array, tif_to_polygons, DataType};
//!
//! let bbox = (-95.3, 29.6, -95.2, 29.7);
//! get_3dep(bbox, "dem.tif", 30, true)?;
//!
//! let dem = tif_to_array("dem.tif", None, Some("elevation"), None, None)?;
//! println!("Mean elevation: {:?}", dem.mean());
//!
//! // After running Basins on dem.tif
//! let basins = tif_to_polygons("basins.tif", DataType::I32, "basin", 8)?;
//! println!("{} basins", basins.len());
//! # Ok::<(), wbt_dem::DemError>(())
//! ```

mod bbox;
mod convert;
mod error;
mod http;
mod nasadem;
mod polygonize;
mod raster;
mod threedep;
mod utm;

pub use bbox::BBox;
pub use convert::{tif_to_array, RasterArray};
pub use error::DemError;
pub use nasadem::{get_nasadem, NASADEM_NODATA};
pub use polygonize::{polygonize, tif_to_polygons, Connectivity, PolygonFeature, PolygonLayer};
pub use raster::{is_geographic, DataType, GeoTransform, Raster};
pub use threedep::{get_3dep, ExportRequest, EPSG_CONUS_ALBERS, THREEDEP_RESOLUTIONS};
pub use utm::UtmZone;

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
