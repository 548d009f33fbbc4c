//! NASADEM (global 1 arc-second DEM) from Microsoft Planetary Computer.
//!
//! Items are found through the Planetary Computer STAC API and each
//! `elevation` asset (a Cloud Optimized GeoTIFF on Azure Blob Storage) is
//! downloaded with a short-lived SAS token appended to its URL.

use crate::http::{client, ensure_tiff, fetch_bytes};
use crate::raster::{DataType, GeoTransform, Raster};
use crate::utm::UtmZone;
use crate::{BBox, DemError, Result};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

const STAC_SEARCH_URL: &str = "https://planetarycomputer.microsoft.com/api/stac/v1/search";
const SAS_TOKEN_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/token";
const COLLECTION: &str = "nasadem";
const ELEVATION_ASSET: &str = "elevation";
const SEARCH_LIMIT: usize = 100;

/// Nominal NASADEM resolution in metres.
const NASADEM_RESOLUTION: f64 = 30.0;

/// Extra pixels fetched around the bbox before reprojecting.
const BUFFER_PIXELS: f64 = 20.0;

/// Nodata marker of the int16 output.
pub const NASADEM_NODATA: f64 = -32768.0;

const EPSG_WGS84: u16 = 4326;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    features: Vec<StacItem>,
}

#[derive(Debug, Deserialize)]
struct StacItem {
    id: String,
    assets: HashMap<String, StacAsset>,
}

#[derive(Debug, Deserialize)]
struct StacAsset {
    href: String,
}

#[derive(Debug, Deserialize)]
struct SasToken {
    token: String,
}

/// Append a SAS token to an asset URL.
fn sign_href(href: &str, token: &str) -> String {
    let sep = if href.contains('?') { '&' } else { '?' };
    format!("{href}{sep}{token}")
}

/// Get a DEM from NASADEM for a bounding box and save it as an int16 GeoTIFF.
///
/// # Arguments
/// * `bbox` - (west, south, east, north) in decimal degrees
/// * `tif_path` - Output GeoTIFF path
/// * `to_utm` - Reproject to the UTM zone of the bbox centre (30 m grid)
pub fn get_nasadem<B, P>(bbox: B, tif_path: P, to_utm: bool) -> Result<()>
where
    B: Into<BBox>,
    P: AsRef<Path>,
{
    let bbox = bbox.into();
    bbox.validate()?;

    let utm = to_utm.then(|| UtmZone::estimate(&bbox));
    let search_bbox = if utm.is_some() {
        bbox.buffer_meters(BUFFER_PIXELS * NASADEM_RESOLUTION)
    } else {
        bbox
    };

    let client = client()?;
    let hrefs = search_assets(&client, &search_bbox)?;
    if hrefs.is_empty() {
        return Err(DemError::NoData(bbox.to_string()));
    }
    let token = sas_token(&client)?;

    let mut tiles = Vec::with_capacity(hrefs.len());
    for href in &hrefs {
        info!("Downloading NASADEM tile {}", href);
        let bytes = fetch_bytes(client.get(sign_href(href, &token)), href)?;
        ensure_tiff(&bytes, href)?;
        tiles.push(Raster::from_reader(Cursor::new(bytes))?);
    }

    let mosaic = mosaic_window(&tiles, &search_bbox)?;
    let mut dem = match utm {
        Some(zone) => reproject_to_utm(&mosaic, &bbox, zone, NASADEM_RESOLUTION),
        None => mosaic,
    };
    dem.metadata_mut()
        .insert("units".to_string(), "meters".to_string());
    dem.metadata_mut()
        .insert("vertical_datum".to_string(), "EGM96".to_string());
    dem.metadata_mut()
        .insert("long_name".to_string(), "elevation".to_string());

    dem.write(tif_path.as_ref(), DataType::I16)?;
    info!("Saved NASADEM DEM to {}", tif_path.as_ref().display());
    Ok(())
}

fn search_assets(client: &reqwest::blocking::Client, bbox: &BBox) -> Result<Vec<String>> {
    let body = serde_json::json!({
        "collections": [COLLECTION],
        "bbox": [bbox.west, bbox.south, bbox.east, bbox.north],
        "limit": SEARCH_LIMIT,
    });
    let bytes = fetch_bytes(client.post(STAC_SEARCH_URL).json(&body), STAC_SEARCH_URL)?;
    let response: SearchResponse = serde_json::from_slice(&bytes)?;
    Ok(elevation_hrefs(response))
}

fn elevation_hrefs(response: SearchResponse) -> Vec<String> {
    response
        .features
        .into_iter()
        .filter_map(|mut item| {
            let asset = item.assets.remove(ELEVATION_ASSET);
            if asset.is_none() {
                debug!("STAC item {} has no {} asset", item.id, ELEVATION_ASSET);
            }
            asset.map(|a| a.href)
        })
        .collect()
}

fn sas_token(client: &reqwest::blocking::Client) -> Result<String> {
    let url = format!("{SAS_TOKEN_URL}/{COLLECTION}");
    let bytes = fetch_bytes(client.get(&url), &url)?;
    let token: SasToken = serde_json::from_slice(&bytes)?;
    Ok(token.token)
}

/// Fill a `width` x `height` grid by sampling each pixel centre.
fn resample_grid<F>(
    width: usize,
    height: usize,
    transform: &GeoTransform,
    sample: F,
) -> Array2<f64>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    Array2::from_shape_fn((height, width), |(row, col)| {
        let (x, y) = transform.pixel_center(col, row);
        sample(x, y).unwrap_or(NASADEM_NODATA)
    })
}

/// Merge tiles onto the first tile's pixel grid, cut to `bbox`.
///
/// Earlier tiles win where tiles overlap.
fn mosaic_window(tiles: &[Raster], bbox: &BBox) -> Result<Raster> {
    let first = tiles
        .first()
        .ok_or_else(|| DemError::NoData(bbox.to_string()))?;
    let grid = first.transform();

    let col0 = ((bbox.west - grid.origin_x) / grid.pixel_width).floor();
    let col1 = ((bbox.east - grid.origin_x) / grid.pixel_width).ceil();
    let row0 = ((grid.origin_y - bbox.north) / grid.pixel_height).floor();
    let row1 = ((grid.origin_y - bbox.south) / grid.pixel_height).ceil();
    let width = (col1 - col0).max(1.0) as usize;
    let height = (row1 - row0).max(1.0) as usize;

    let transform = GeoTransform {
        origin_x: grid.origin_x + col0 * grid.pixel_width,
        origin_y: grid.origin_y - row0 * grid.pixel_height,
        pixel_width: grid.pixel_width,
        pixel_height: grid.pixel_height,
    };
    let data = resample_grid(width, height, &transform, |x, y| {
        tiles.iter().find_map(|tile| tile.sample(x, y))
    });

    let mut mosaic = Raster::from_array(data, transform);
    mosaic.set_nodata(Some(NASADEM_NODATA));
    mosaic.set_crs(first.crs().or(Some(EPSG_WGS84)));
    Ok(mosaic)
}

/// Nearest-neighbour resample of a geographic raster onto a UTM grid
/// covering the projected `bbox`.
fn reproject_to_utm(src: &Raster, bbox: &BBox, zone: UtmZone, resolution: f64) -> Raster {
    let (min_x, min_y, max_x, max_y) = zone.project_bbox(bbox);
    let width = (((max_x - min_x) / resolution).ceil() as usize).max(1);
    let height = (((max_y - min_y) / resolution).ceil() as usize).max(1);
    let transform = GeoTransform {
        origin_x: min_x,
        origin_y: max_y,
        pixel_width: resolution,
        pixel_height: resolution,
    };
    let data = resample_grid(width, height, &transform, |x, y| {
        let (lon, lat) = zone.inverse(x, y);
        src.sample(lon, lat)
    });

    let mut out = Raster::from_array(data, transform);
    out.set_nodata(Some(NASADEM_NODATA));
    out.set_crs(Some(zone.epsg()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geographic_tile(west: f64, north: f64, size: usize, value: f64) -> Raster {
        let transform = GeoTransform {
            origin_x: west,
            origin_y: north,
            pixel_width: 1.0 / size as f64,
            pixel_height: 1.0 / size as f64,
        };
        let mut tile = Raster::new(size, size, transform, value);
        tile.set_nodata(Some(NASADEM_NODATA));
        tile.set_crs(Some(EPSG_WGS84));
        tile
    }

    #[test]
    fn test_sign_href() {
        assert_eq!(sign_href("https://a/b.tif", "st=1&sig=x"), "https://a/b.tif?st=1&sig=x");
        assert_eq!(sign_href("https://a/b.tif?v=2", "sig=x"), "https://a/b.tif?v=2&sig=x");
    }

    #[test]
    fn test_elevation_hrefs() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"id": "nasadem_n29w096", "assets": {
                "elevation": {"href": "https://nasademeuwest.blob.core.windows.net/nasadem-cog/v001/NASADEM_HGT_n29w096.tif"}
            }},
            {"id": "broken", "assets": {"thumbnail": {"href": "x.png"}}}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let hrefs = elevation_hrefs(response);
        assert_eq!(hrefs.len(), 1);
        assert!(hrefs[0].ends_with("NASADEM_HGT_n29w096.tif"));
    }

    #[test]
    fn test_mosaic_window_spans_tiles() {
        let west = geographic_tile(-96.0, 30.0, 10, 5.0);
        let east = geographic_tile(-95.0, 30.0, 10, 7.0);
        let bbox = BBox::from((-95.25, 29.55, -94.75, 29.85));
        let mosaic = mosaic_window(&[west, east], &bbox).unwrap();

        assert_eq!((mosaic.width(), mosaic.height()), (6, 4));
        assert_eq!(mosaic.crs(), Some(EPSG_WGS84));
        let row: Vec<f64> = (0..6).map(|c| mosaic.get(c, 0).unwrap()).collect();
        assert_eq!(row, vec![5.0, 5.0, 5.0, 7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_mosaic_window_outside_tiles_is_nodata() {
        let tile = geographic_tile(-96.0, 30.0, 10, 5.0);
        let bbox = BBox::from((-95.15, 29.85, -94.85, 29.95));
        let mosaic = mosaic_window(&[tile], &bbox).unwrap();
        assert_eq!(mosaic.get(0, 0), Some(5.0));
        assert_eq!(mosaic.get(mosaic.width() - 1, 0), Some(NASADEM_NODATA));
    }

    #[test]
    fn test_reproject_to_utm() {
        let tile = geographic_tile(-96.0, 30.0, 100, 42.0);
        let bbox = BBox::from((-95.21, 29.69, -95.19, 29.71));
        let zone = UtmZone::estimate(&bbox);
        let out = reproject_to_utm(&tile, &bbox, zone, 30.0);

        assert_eq!(out.crs(), Some(32615));
        assert!(out.width() > 60 && out.width() < 75);
        assert!(out.height() > 70 && out.height() < 80);
        assert!(out.data().iter().all(|&v| v == 42.0));
    }
}
