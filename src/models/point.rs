//! Point records for stations and facilities.

use serde::{Deserialize, Serialize};

use crate::distance::haversine_m;
use crate::error::{CatchmentError, Result};

/// Which side of the join a point set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Station,
    Facility,
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointKind::Station => write!(f, "station"),
            PointKind::Facility => write!(f, "facility"),
        }
    }
}

/// Geographic point (lat/lon, decimal degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Great-circle distance to `other` in meters
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_m(self.lat, self.lon, other.lat, other.lon)
    }
}

/// A named location inside an administrative region.
///
/// `attribute` is the subway line for stations and the facility category
/// for facilities. It is carried through to the output unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub location: GeoPoint,
}

impl Point {
    /// Validate and build a point.
    ///
    /// Name and region are trimmed; both must be non-empty afterwards.
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        attribute: Option<String>,
        lat: f64,
        lon: f64,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(CatchmentError::EmptyName);
        }

        let region = region.into().trim().to_string();
        if region.is_empty() {
            return Err(CatchmentError::EmptyRegion { name });
        }

        let location = GeoPoint::new(lat, lon).ok_or_else(|| CatchmentError::InvalidCoordinate {
            name: name.clone(),
            latitude: lat,
            longitude: lon,
        })?;

        Ok(Self {
            name,
            region,
            attribute: attribute.filter(|a| !a.trim().is_empty()),
            location,
        })
    }

    pub fn lat(&self) -> f64 {
        self.location.lat
    }

    pub fn lon(&self) -> f64 {
        self.location.lon
    }
}

/// A point addressed by its position in the input set.
///
/// Two points with the same name are still distinct rows; the index is the
/// identity used when reducing to nearest neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRef<'a> {
    pub index: usize,
    pub point: &'a Point,
}

impl<'a> PointRef<'a> {
    pub fn region(&self) -> &'a str {
        &self.point.region
    }
}

/// Ordered collection of points of one kind
#[derive(Debug, Clone)]
pub struct PointSet {
    kind: PointKind,
    points: Vec<Point>,
}

impl PointSet {
    pub fn new(kind: PointKind) -> Self {
        Self {
            kind,
            points: Vec::new(),
        }
    }

    pub fn from_points(kind: PointKind, points: Vec<Point>) -> Self {
        Self { kind, points }
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    /// Append a point, returning its index
    pub fn push(&mut self, point: Point) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<PointRef<'_>> {
        self.points.get(index).map(|point| PointRef { index, point })
    }

    /// Iterate over points in input order
    pub fn iter(&self) -> impl Iterator<Item = PointRef<'_>> {
        self.points
            .iter()
            .enumerate()
            .map(|(index, point)| PointRef { index, point })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
