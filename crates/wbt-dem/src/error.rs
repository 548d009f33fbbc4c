//! Error types for the DEM crate.

use thiserror::Error;

/// Errors that can occur when fetching or converting DEM data.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// The raster has more than one band.
    #[error("Expected a single-band raster, found {0:?}")]
    NotSingleBand(tiff::ColorType),

    /// Unknown data type name.
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Bounding box is malformed.
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    /// Requested 3DEP resolution is not served.
    #[error("Resolution must be one of 10, 30, or 60 meters.")]
    InvalidResolution(u32),

    /// Pixel connectivity other than 4 or 8.
    #[error("Connectivity must be 4 or 8, got {0}")]
    InvalidConnectivity(u8),

    /// Requested area needs more pixels than the service returns in one image.
    #[error("Requested image of {width}x{height} pixels exceeds the {max} pixel limit per side")]
    RequestTooLarge {
        /// Requested width in pixels.
        width: usize,
        /// Requested height in pixels.
        height: usize,
        /// Service limit per side.
        max: usize,
    },

    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Remote service answered with something other than the expected payload.
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed {
        /// Requested URL (without query signature).
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// No DEM data covers the requested area.
    #[error("No DEM data found for bounding box {0}")]
    NoData(String),

    /// JSON decoding error from a remote API.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
