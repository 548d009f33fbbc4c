//! Geographic bounding boxes.

use crate::{DemError, Result};
use std::fmt;

/// Metres per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Bounding box in decimal degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    /// Create a bounding box, checking that it is well formed.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        let bbox = Self {
            west,
            south,
            east,
            north,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check ordering and coordinate ranges.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(DemError::InvalidBbox(format!("{self} has non-finite values")));
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(DemError::InvalidBbox(format!(
                "{self} must be ordered as (west, south, east, north)"
            )));
        }
        if self.west < -180.0 || self.east > 180.0 || self.south < -90.0 || self.north > 90.0 {
            return Err(DemError::InvalidBbox(format!(
                "{self} is outside the valid longitude/latitude range"
            )));
        }
        Ok(())
    }

    /// Centre point as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        ((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    /// Approximate size in metres as (width, height), measured at the centre latitude.
    pub fn size_meters(&self) -> (f64, f64) {
        let (_, lat) = self.center();
        let width = (self.east - self.west) * METERS_PER_DEGREE * lat.to_radians().cos();
        let height = (self.north - self.south) * METERS_PER_DEGREE;
        (width, height)
    }

    /// Grow the box by `meters` on every side, using the same approximation
    /// as [`BBox::size_meters`].
    pub fn buffer_meters(&self, meters: f64) -> BBox {
        let (_, lat) = self.center();
        let dlat = meters / METERS_PER_DEGREE;
        let dlon = meters / (METERS_PER_DEGREE * lat.to_radians().cos().max(1e-6));
        BBox {
            west: (self.west - dlon).max(-180.0),
            south: (self.south - dlat).max(-90.0),
            east: (self.east + dlon).min(180.0),
            north: (self.north + dlat).min(90.0),
        }
    }
}

impl From<(f64, f64, f64, f64)> for BBox {
    fn from((west, south, east, north): (f64, f64, f64, f64)) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.west, self.south, self.east, self.north
        )
    }
}
