//! Single-band GeoTIFF raster representation.
//!
//! WhiteboxTools reads and writes plain GeoTIFFs, so the georeferencing we
//! need is limited to the baseline GeoTIFF tags:
//! - `ModelPixelScale` (33550) and `ModelTiepoint` (33922), or
//!   `ModelTransformation` (34264) as a fallback
//! - `GeoKeyDirectory` (34735) for the EPSG code
//! - `GDAL_NODATA` (42113) and `GDAL_METADATA` (42112)

use crate::{DemError, Result};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_METADATA: u16 = 42112;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const KEY_USER_DEFINED: u16 = 32767;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Resolve a numeric tag to the variant the decoder keys its directory by.
fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Pixel data types understood by the readers and writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl DataType {
    /// Whether values of this type are floating point.
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Convert a value to this type and back, mirroring a numeric cast.
    ///
    /// Integer casts truncate toward zero and saturate at the type bounds;
    /// NaN becomes zero.
    pub fn cast(self, value: f64) -> f64 {
        match self {
            DataType::U8 => value as u8 as f64,
            DataType::U16 => value as u16 as f64,
            DataType::U32 => value as u32 as f64,
            DataType::I8 => value as i8 as f64,
            DataType::I16 => value as i16 as f64,
            DataType::I32 => value as i32 as f64,
            DataType::F32 => value as f32 as f64,
            DataType::F64 => value,
        }
    }

    /// The conventional lower-case name (`int16`, `float32`, ...).
    pub fn name(self) -> &'static str {
        match self {
            DataType::U8 => "uint8",
            DataType::U16 => "uint16",
            DataType::U32 => "uint32",
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = DemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uint8" | "u8" => Ok(DataType::U8),
            "uint16" | "u16" => Ok(DataType::U16),
            "uint32" | "u32" => Ok(DataType::U32),
            "int8" | "i8" => Ok(DataType::I8),
            "int16" | "i16" => Ok(DataType::I16),
            "int32" | "i32" => Ok(DataType::I32),
            "float32" | "f32" => Ok(DataType::F32),
            "float64" | "f64" | "float" => Ok(DataType::F64),
            _ => Err(DemError::UnsupportedDataType(s.to_string())),
        }
    }
}

/// Affine transform of a north-up raster (no rotation terms).
///
/// `(origin_x, origin_y)` is the outer corner of the top-left pixel.
/// `pixel_height` is positive; rows advance southward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// World coordinates of a (fractional) pixel position.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y - row * self.pixel_height,
        )
    }

    /// Fractional pixel position of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    /// World coordinates of the centre of pixel `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Outer bounds of a `width` x `height` grid as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (max_x, min_y) = self.pixel_to_world(width as f64, height as f64);
        (self.origin_x, min_y, max_x, self.origin_y)
    }
}

/// A single-band raster held in memory as `f64` values, row-major from the
/// north-west corner.
#[derive(Debug, Clone)]
pub struct Raster {
    data: Vec<f64>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    crs: Option<u16>,
    nodata: Option<f64>,
    dtype: DataType,
    metadata: BTreeMap<String, String>,
}

impl Raster {
    /// Create a raster filled with `fill`.
    pub fn new(width: usize, height: usize, transform: GeoTransform, fill: f64) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            transform,
            crs: None,
            nodata: None,
            dtype: DataType::F64,
            metadata: BTreeMap::new(),
        }
    }

    /// Build a raster from an array indexed `[row, col]`.
    pub fn from_array(data: Array2<f64>, transform: GeoTransform) -> Self {
        let (height, width) = data.dim();
        Self {
            data: data.iter().copied().collect(),
            width,
            height,
            transform,
            crs: None,
            nodata: None,
            dtype: DataType::F64,
            metadata: BTreeMap::new(),
        }
    }

    /// Load a raster from a GeoTIFF file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Decode a GeoTIFF from any seekable reader (e.g. a downloaded buffer).
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut decoder = Decoder::new(reader)?;

        // Merged DEM tiles can be large; allow up to 1 GB buffers
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024;
        limits.intermediate_buffer_size = 1024 * 1024 * 1024;
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => return Err(DemError::NotSingleBand(other)),
        }

        let (width, height) = decoder.dimensions()?;
        let transform = Self::read_geotransform(&mut decoder)?;
        let crs = Self::read_epsg(&mut decoder);
        let nodata = Self::read_nodata_value(&mut decoder);
        let metadata = decoder
            .get_tag_ascii_string(tag(TAG_GDAL_METADATA))
            .map(|xml| parse_gdal_metadata(&xml))
            .unwrap_or_default();
        let (data, dtype) = Self::decode_data(&mut decoder)?;

        Ok(Self {
            data,
            width: width as usize,
            height: height as usize,
            transform,
            crs,
            nodata,
            dtype,
            metadata,
        })
    }

    fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
        let tiepoint = decoder.get_tag_f64_vec(tag(TAG_MODEL_TIEPOINT));
        let pixel_scale = decoder.get_tag_f64_vec(tag(TAG_MODEL_PIXEL_SCALE));

        if let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) {
            if tiepoint.len() >= 6 && scale.len() >= 2 {
                // Tiepoint format: [i, j, k, x, y, z], raster (i, j) maps to model (x, y)
                let (i, j) = (tiepoint[0], tiepoint[1]);
                return Ok(GeoTransform {
                    origin_x: tiepoint[3] - i * scale[0],
                    origin_y: tiepoint[4] + j * scale[1],
                    pixel_width: scale[0],
                    pixel_height: scale[1],
                });
            }
        }

        if let Ok(m) = decoder.get_tag_f64_vec(tag(TAG_MODEL_TRANSFORMATION)) {
            if m.len() >= 8 && m[1] == 0.0 && m[4] == 0.0 {
                return Ok(GeoTransform {
                    origin_x: m[3],
                    origin_y: m[7],
                    pixel_width: m[0],
                    pixel_height: -m[5],
                });
            }
        }

        Err(DemError::InvalidGeoTiff(
            "missing ModelPixelScale/ModelTiepoint or north-up ModelTransformation".to_string(),
        ))
    }

    fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u16> {
        let keys = decoder.get_tag_u16_vec(tag(TAG_GEO_KEY_DIRECTORY)).ok()?;
        if keys.len() < 4 {
            return None;
        }

        // Header [version, revision, minor, count], then 4-wide entries
        // [key, location, count, value]; location 0 means the value is inline.
        let mut projected = None;
        let mut geographic = None;
        for entry in keys[4..].chunks_exact(4) {
            if entry[1] != 0 || entry[3] == KEY_USER_DEFINED {
                continue;
            }
            match entry[0] {
                KEY_PROJECTED_CS_TYPE => projected = Some(entry[3]),
                KEY_GEOGRAPHIC_TYPE => geographic = Some(entry[3]),
                _ => {}
            }
        }
        projected.or(geographic)
    }

    fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
        // GDAL_NODATA is an ASCII string, possibly "nan"
        let text = decoder.get_tag_ascii_string(tag(TAG_GDAL_NODATA)).ok()?;
        text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .parse()
            .ok()
    }

    fn decode_data<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<(Vec<f64>, DataType)> {
        let decoded = match decoder.read_image()? {
            DecodingResult::U8(v) => (v.into_iter().map(f64::from).collect(), DataType::U8),
            DecodingResult::U16(v) => (v.into_iter().map(f64::from).collect(), DataType::U16),
            DecodingResult::U32(v) => (v.into_iter().map(f64::from).collect(), DataType::U32),
            DecodingResult::U64(v) => (v.into_iter().map(|x| x as f64).collect(), DataType::F64),
            DecodingResult::I8(v) => (v.into_iter().map(f64::from).collect(), DataType::I8),
            DecodingResult::I16(v) => (v.into_iter().map(f64::from).collect(), DataType::I16),
            DecodingResult::I32(v) => (v.into_iter().map(f64::from).collect(), DataType::I32),
            DecodingResult::I64(v) => (v.into_iter().map(|x| x as f64).collect(), DataType::F64),
            DecodingResult::F32(v) => (v.into_iter().map(f64::from).collect(), DataType::F32),
            DecodingResult::F64(v) => (v, DataType::F64),
        };
        Ok(decoded)
    }

    /// Write the raster as an uncompressed GeoTIFF with pixels of `dtype`.
    pub fn write<P: AsRef<Path>>(&self, path: P, dtype: DataType) -> Result<()> {
        let file = BufWriter::new(File::create(path.as_ref())?);
        let mut encoder = TiffEncoder::new(file)?;
        match dtype {
            DataType::U8 => self.write_band::<_, colortype::Gray8>(&mut encoder, |v| v as u8),
            DataType::U16 => self.write_band::<_, colortype::Gray16>(&mut encoder, |v| v as u16),
            DataType::U32 => self.write_band::<_, colortype::Gray32>(&mut encoder, |v| v as u32),
            DataType::I8 => self.write_band::<_, colortype::GrayI8>(&mut encoder, |v| v as i8),
            DataType::I16 => self.write_band::<_, colortype::GrayI16>(&mut encoder, |v| v as i16),
            DataType::I32 => self.write_band::<_, colortype::GrayI32>(&mut encoder, |v| v as i32),
            DataType::F32 => {
                self.write_band::<_, colortype::Gray32Float>(&mut encoder, |v| v as f32)
            }
            DataType::F64 => self.write_band::<_, colortype::Gray64Float>(&mut encoder, |v| v),
        }
    }

    fn write_band<W, C>(
        &self,
        encoder: &mut TiffEncoder<W>,
        convert: impl Fn(f64) -> C::Inner,
    ) -> Result<()>
    where
        W: Write + Seek,
        C: colortype::ColorType,
        [C::Inner]: TiffValue,
    {
        let pixels: Vec<C::Inner> = self.data.iter().map(|&v| convert(v)).collect();
        let mut image = encoder.new_image::<C>(self.width as u32, self.height as u32)?;
        self.write_geotags(image.encoder())?;
        image.write_data(&pixels)?;
        Ok(())
    }

    fn write_geotags<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<'_, W, K>,
    ) -> Result<()> {
        let t = &self.transform;
        let scale = [t.pixel_width, t.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
        dir.write_tag(tag(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
        dir.write_tag(tag(TAG_MODEL_TIEPOINT), &tiepoint[..])?;

        if let Some(epsg) = self.crs {
            let keys = geo_key_directory(epsg);
            dir.write_tag(tag(TAG_GEO_KEY_DIRECTORY), &keys[..])?;
        }
        if let Some(nodata) = self.nodata {
            let text = format_nodata(nodata);
            dir.write_tag(tag(TAG_GDAL_NODATA), text.as_str())?;
        }
        if !self.metadata.is_empty() {
            let xml = format_gdal_metadata(&self.metadata);
            dir.write_tag(tag(TAG_GDAL_METADATA), xml.as_str())?;
        }
        Ok(())
    }

    /// Raster width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// EPSG code of the coordinate reference system, when known.
    pub fn crs(&self) -> Option<u16> {
        self.crs
    }

    pub fn set_crs(&mut self, epsg: Option<u16>) {
        self.crs = epsg;
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    /// Data type the pixels were stored as on disk.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Value at pixel `(col, row)`, or `None` outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        (col < self.width && row < self.height).then(|| self.data[row * self.width + col])
    }

    /// Set pixel `(col, row)`; writes outside the grid are ignored.
    pub fn set(&mut self, col: usize, row: usize, value: f64) {
        if col < self.width && row < self.height {
            self.data[row * self.width + col] = value;
        }
    }

    /// Whether `value` is the nodata marker (NaN always counts).
    pub fn is_nodata(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(nd) if nd.is_nan() => false,
            Some(nd) => value == nd,
            None => false,
        }
    }

    /// Nearest-pixel sample at a world coordinate, skipping nodata.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.world_to_pixel(x, y);
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let value = self.get(col.floor() as usize, row.floor() as usize)?;
        (!self.is_nodata(value)).then_some(value)
    }
}

/// Whether an EPSG code names a geographic (lat/lon) CRS.
pub fn is_geographic(epsg: u16) -> bool {
    (4000..5000).contains(&epsg)
}

#[rustfmt::skip]
fn geo_key_directory(epsg: u16) -> Vec<u16> {
    let (model, crs_key) = if is_geographic(epsg) {
        (MODEL_TYPE_GEOGRAPHIC, KEY_GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, KEY_PROJECTED_CS_TYPE)
    };
    vec![
        1, 1, 0, 3,
        KEY_MODEL_TYPE, 0, 1, model,
        KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, epsg,
    ]
}

fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn format_gdal_metadata(items: &BTreeMap<String, String>) -> String {
    let mut xml = String::from("<GDALMetadata>\n");
    for (name, value) in items {
        xml.push_str(&format!(
            "  <Item name=\"{}\">{}</Item>\n",
            escape_xml(name),
            escape_xml(value)
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}

/// Extract dataset-level `<Item name="...">value</Item>` entries.
///
/// Band-level items (those carrying a `sample` attribute) are skipped.
fn parse_gdal_metadata(xml: &str) -> BTreeMap<String, String> {
    let mut items = BTreeMap::new();
    for chunk in xml.split("<Item").skip(1) {
        let Some(open_end) = chunk.find('>') else {
            continue;
        };
        let attrs = &chunk[..open_end];
        if attrs.contains("sample=") {
            continue;
        }
        let Some(name_start) = attrs.find("name=\"").map(|i| i + 6) else {
            continue;
        };
        let Some(name_len) = attrs[name_start..].find('"') else {
            continue;
        };
        let Some(close) = chunk.find("</Item>") else {
            continue;
        };
        let name = unescape_xml(&attrs[name_start..name_start + name_len]);
        let value = unescape_xml(&chunk[open_end + 1..close]);
        items.insert(name, value);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_transform() -> GeoTransform {
        GeoTransform {
            origin_x: -95.5,
            origin_y: 29.75,
            pixel_width: 0.25,
            pixel_height: 0.125,
        }
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!("int32".parse::<DataType>().unwrap(), DataType::I32);
        assert_eq!("Float32".parse::<DataType>().unwrap(), DataType::F32);
        assert_eq!("u8".parse::<DataType>().unwrap(), DataType::U8);
        assert!("complex64".parse::<DataType>().is_err());
        assert_eq!(DataType::I16.to_string(), "int16");
    }

    #[test]
    fn test_data_type_cast() {
        assert_eq!(DataType::I16.cast(12.9), 12.0);
        assert_eq!(DataType::I16.cast(-40000.0), i16::MIN as f64);
        assert_eq!(DataType::U8.cast(-3.0), 0.0);
        assert_eq!(DataType::I32.cast(f64::NAN), 0.0);
        assert!(DataType::F32.cast(f64::NAN).is_nan());
        assert!(DataType::F64.is_float());
        assert!(!DataType::I8.is_float());
    }

    #[test]
    fn test_geotransform() {
        let t = sample_transform();
        assert_eq!(t.pixel_to_world(0.0, 0.0), (-95.5, 29.75));
        assert_eq!(t.pixel_center(1, 1), (-95.125, 29.5625));
        let (col, row) = t.world_to_pixel(-95.0, 29.5);
        assert_relative_eq!(col, 2.0);
        assert_relative_eq!(row, 2.0);
        assert_eq!(t.bounds(4, 2), (-95.5, 29.5, -94.5, 29.75));
    }

    #[test]
    fn test_nodata_detection() {
        let mut raster = Raster::new(2, 1, sample_transform(), 0.0);
        assert!(!raster.is_nodata(0.0));
        assert!(raster.is_nodata(f64::NAN));
        raster.set_nodata(Some(-32768.0));
        assert!(raster.is_nodata(-32768.0));
        raster.set(1, 0, -32768.0);
        assert_eq!(raster.get(1, 0), Some(-32768.0));
        assert_eq!(raster.get(2, 0), None);
    }

    #[test]
    fn test_from_array_is_row_major() {
        let data = Array2::from_shape_fn((2, 3), |(row, col)| (row * 10 + col) as f64);
        let raster = Raster::from_array(data, sample_transform());
        assert_eq!((raster.width(), raster.height()), (3, 2));
        assert_eq!(raster.get(2, 0), Some(2.0));
        assert_eq!(raster.get(0, 1), Some(10.0));
        assert_eq!(raster.sample(-95.1, 29.6), Some(11.0));
    }

    #[test]
    fn test_geo_key_directory() {
        let keys = geo_key_directory(4326);
        assert_eq!(keys[3], 3);
        assert_eq!(&keys[4..8], &[KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
        assert_eq!(&keys[12..16], &[KEY_GEOGRAPHIC_TYPE, 0, 1, 4326]);

        let keys = geo_key_directory(5070);
        assert_eq!(&keys[12..16], &[KEY_PROJECTED_CS_TYPE, 0, 1, 5070]);
    }

    #[test]
    fn test_gdal_metadata() {
        let xml = "<GDALMetadata>\n  <Item name=\"units\">meters</Item>\n  \
                   <Item name=\"STATISTICS_MEAN\" sample=\"0\">1.5</Item>\n  \
                   <Item name=\"note\">a &amp; b</Item>\n</GDALMetadata>";
        let items = parse_gdal_metadata(xml);
        assert_eq!(items.len(), 2);
        assert_eq!(items["units"], "meters");
        assert_eq!(items["note"], "a & b");

        let back = parse_gdal_metadata(&format_gdal_metadata(&items));
        assert_eq!(back, items);
    }

    #[test]
    fn test_write_and_read_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tif");

        let mut raster = Raster::new(3, 2, sample_transform(), 0.0);
        raster.data_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0, -9999.0, 6.0]);
        raster.set_crs(Some(4326));
        raster.set_nodata(Some(-9999.0));
        raster
            .metadata_mut()
            .insert("vertical_datum".to_string(), "NAVD88".to_string());
        raster.write(&path, DataType::I16).unwrap();

        let loaded = Raster::read(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (3, 2));
        assert_eq!(loaded.dtype(), DataType::I16);
        assert_eq!(loaded.crs(), Some(4326));
        assert_eq!(loaded.nodata(), Some(-9999.0));
        assert_eq!(loaded.transform(), &sample_transform());
        assert_eq!(loaded.data(), raster.data());
        assert_eq!(loaded.metadata()["vertical_datum"], "NAVD88");
        assert_eq!(loaded.sample(-95.2, 29.7), Some(2.0));
        assert_eq!(loaded.sample(-95.2, 29.6), None);
        assert_eq!(loaded.sample(-96.0, 29.7), None);
    }
}
