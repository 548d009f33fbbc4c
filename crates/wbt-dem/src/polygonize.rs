//! Raster to polygon conversion.
//!
//! Pixels of equal value that are 4- or 8-connected form one feature. Each
//! feature's outline is traced along pixel edges:
//!
//! 1. Label connected components (nodata pixels are skipped).
//! 2. For every pixel, emit each side that borders a different component as
//!    a directed edge, oriented so exteriors have positive signed area in
//!    pixel space and holes negative.
//! 3. Chain edges into rings. At a vertex shared by two diagonal pixels of
//!    one component there are two ways on; 8-connectivity crosses over to
//!    the diagonal pixel, so the pixels enclosed by that corner become a
//!    hole touching the exterior at one point. 4-connectivity stays with
//!    the same pixel and the exterior ring touches itself instead.
//! 4. Drop collinear vertices, attach holes to the exterior that contains
//!    them, map pixel corners to world coordinates and orient the result
//!    (exterior counter-clockwise, holes clockwise).

use crate::raster::{DataType, Raster};
use crate::{DemError, Result};
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Contains, Coord, LineString, MapCoords, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use std::collections::{HashMap, VecDeque};
use std::path::Path;

const UNLABELLED: u32 = u32::MAX;

/// Pixel neighbourhood used to group pixels into features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    Eight,
}

impl TryFrom<u8> for Connectivity {
    type Error = DemError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            4 => Ok(Connectivity::Four),
            8 => Ok(Connectivity::Eight),
            other => Err(DemError::InvalidConnectivity(other)),
        }
    }
}

/// One connected group of equal-valued pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub value: f64,
    pub geometry: Polygon<f64>,
}

/// Features extracted from one raster.
#[derive(Debug, Clone)]
pub struct PolygonLayer {
    /// Property name the feature values are stored under.
    pub feat_name: String,
    pub dtype: DataType,
    pub crs: Option<u16>,
    pub features: Vec<PolygonFeature>,
}

impl PolygonLayer {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Convert to a GeoJSON feature collection with the value stored under
    /// `feat_name`.
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| {
                let mut properties = JsonObject::new();
                properties.insert(self.feat_name.clone(), self.json_value(f.value));
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&f.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let foreign_members = self.crs.map(|epsg| {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                serde_json::json!({
                    "type": "name",
                    "properties": { "name": format!("urn:ogc:def:crs:EPSG::{epsg}") }
                }),
            );
            members
        });

        FeatureCollection {
            bbox: None,
            features,
            foreign_members,
        }
    }

    fn json_value(&self, value: f64) -> JsonValue {
        if self.dtype.is_float() {
            serde_json::Number::from_f64(value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)
        } else {
            JsonValue::from(value as i64)
        }
    }
}

/// Convert a single-band GeoTIFF to polygons.
///
/// # Arguments
/// * `dtype` - Type the pixel values are cast to before grouping
/// * `feat_name` - Property name for the feature values
/// * `connectivity` - 4 or 8
pub fn tif_to_polygons<P: AsRef<Path>>(
    tif_path: P,
    dtype: DataType,
    feat_name: &str,
    connectivity: u8,
) -> Result<PolygonLayer> {
    let connectivity = Connectivity::try_from(connectivity)?;
    let raster = Raster::read(tif_path)?;
    Ok(PolygonLayer {
        feat_name: feat_name.to_string(),
        dtype,
        crs: raster.crs(),
        features: polygonize(&raster, dtype, connectivity),
    })
}

/// Polygonize an in-memory raster.
pub fn polygonize(
    raster: &Raster,
    dtype: DataType,
    connectivity: Connectivity,
) -> Vec<PolygonFeature> {
    let (width, height) = (raster.width(), raster.height());
    let valid: Vec<bool> = raster.data().iter().map(|&v| !raster.is_nodata(v)).collect();
    let values: Vec<f64> = raster.data().iter().map(|&v| dtype.cast(v)).collect();

    let (labels, component_values) =
        label_components(&values, &valid, width, height, connectivity);
    let edges = boundary_edges(&labels, width, height, component_values.len());

    let transform = raster.transform();
    component_values
        .iter()
        .zip(edges)
        .flat_map(|(&value, component_edges)| {
            trace_polygons(&component_edges, connectivity)
                .into_iter()
                .map(move |polygon| (value, polygon))
        })
        .map(|(value, polygon)| {
            let geometry = polygon
                .map_coords(|Coord { x, y }| {
                    let (x, y) = transform.pixel_to_world(x, y);
                    Coord { x, y }
                })
                .orient(Direction::Default);
            PolygonFeature { value, geometry }
        })
        .collect()
}

/// Label connected components of equal value in row-major discovery order.
fn label_components(
    values: &[f64],
    valid: &[bool],
    width: usize,
    height: usize,
    connectivity: Connectivity,
) -> (Vec<u32>, Vec<f64>) {
    const FOUR: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
    const EIGHT: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    let offsets: &[(i64, i64)] = match connectivity {
        Connectivity::Four => &FOUR,
        Connectivity::Eight => &EIGHT,
    };

    let mut labels = vec![UNLABELLED; values.len()];
    let mut component_values = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..values.len() {
        if !valid[start] || labels[start] != UNLABELLED {
            continue;
        }
        let label = component_values.len() as u32;
        let value = values[start];
        component_values.push(value);
        labels[start] = label;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (col, row) = ((idx % width) as i64, (idx / width) as i64);
            for &(dc, dr) in offsets {
                let (c, r) = (col + dc, row + dr);
                if c < 0 || r < 0 || c >= width as i64 || r >= height as i64 {
                    continue;
                }
                let n = r as usize * width + c as usize;
                if valid[n] && labels[n] == UNLABELLED && values[n] == value {
                    labels[n] = label;
                    queue.push_back(n);
                }
            }
        }
    }
    (labels, component_values)
}

/// A directed pixel-side edge. `beyond` is the centre of the pixel on the
/// far side, in pixel units, used to place holes.
#[derive(Debug, Clone, Copy)]
struct Edge {
    start: (i64, i64),
    end: (i64, i64),
    pixel: usize,
    beyond: (f64, f64),
}

/// Boundary edges of every component, indexed by label.
fn boundary_edges(labels: &[u32], width: usize, height: usize, count: usize) -> Vec<Vec<Edge>> {
    let mut edges = vec![Vec::new(); count];
    let label_at = |c: i64, r: i64| -> u32 {
        if c < 0 || r < 0 || c >= width as i64 || r >= height as i64 {
            UNLABELLED
        } else {
            labels[r as usize * width + c as usize]
        }
    };

    for (idx, &label) in labels.iter().enumerate() {
        if label == UNLABELLED {
            continue;
        }
        let (c, r) = ((idx % width) as i64, (idx / width) as i64);
        let (cx, cy) = (c as f64 + 0.5, r as f64 + 0.5);
        // (neighbour offset, start corner, end corner), clockwise on screen
        let sides = [
            ((0, -1), (c, r), (c + 1, r)),
            ((1, 0), (c + 1, r), (c + 1, r + 1)),
            ((0, 1), (c + 1, r + 1), (c, r + 1)),
            ((-1, 0), (c, r + 1), (c, r)),
        ];
        for ((dc, dr), start, end) in sides {
            if label_at(c + dc, r + dr) != label {
                edges[label as usize].push(Edge {
                    start,
                    end,
                    pixel: idx,
                    beyond: (cx + dc as f64, cy + dr as f64),
                });
            }
        }
    }
    edges
}

/// Chain one component's edges into polygons in pixel coordinates.
fn trace_polygons(edges: &[Edge], connectivity: Connectivity) -> Vec<Polygon<f64>> {
    let mut outgoing: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.start).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut exteriors: Vec<Polygon<f64>> = Vec::new();
    let mut holes: Vec<(LineString<f64>, Point<f64>)> = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let mut ring_edges = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            ring_edges.push(current);
            let edge = &edges[current];
            let candidates = outgoing.get(&edge.end).map(Vec::as_slice).unwrap_or_default();
            let next = match candidates {
                [only] => *only,
                [a, b] => {
                    let same_pixel = edges[*a].pixel == edge.pixel;
                    match (connectivity, same_pixel) {
                        (Connectivity::Four, true) | (Connectivity::Eight, false) => *a,
                        _ => *b,
                    }
                }
                _ => break,
            };
            if next == first || used[next] {
                break;
            }
            current = next;
        }

        let ring = simplify_ring(&ring_edges.iter().map(|&i| edges[i]).collect::<Vec<_>>());
        let outline = Polygon::new(ring, Vec::new());
        let area = outline.signed_area();
        if area > 0.0 {
            exteriors.push(outline);
        } else if area < 0.0 {
            let (x, y) = edges[first].beyond;
            holes.push((outline.into_inner().0, Point::new(x, y)));
        }
    }

    let owners: Vec<Option<usize>> = holes
        .iter()
        .map(|(_, inside)| {
            if exteriors.len() == 1 {
                return Some(0);
            }
            exteriors
                .iter()
                .enumerate()
                .filter(|(_, exterior)| exterior.contains(inside))
                .min_by(|a, b| a.1.unsigned_area().total_cmp(&b.1.unsigned_area()))
                .map(|(i, _)| i)
        })
        .collect();
    for ((hole, _), owner) in holes.into_iter().zip(owners) {
        if let Some(i) = owner {
            exteriors[i].interiors_push(hole);
        }
    }
    exteriors
}

/// Closed ring of corner points with collinear vertices removed.
fn simplify_ring(edges: &[Edge]) -> LineString<f64> {
    let n = edges.len();
    let direction = |e: &Edge| (e.end.0 - e.start.0, e.end.1 - e.start.1);
    let mut ring: LineString<f64> = (0..n)
        .filter(|&i| direction(&edges[(i + n - 1) % n]) != direction(&edges[i]))
        .map(|i| {
            let (x, y) = edges[i].start;
            Coord {
                x: x as f64,
                y: y as f64,
            }
        })
        .collect();
    ring.close();
    ring
}
