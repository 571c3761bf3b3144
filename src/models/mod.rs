//! Core data models for the region-restricted proximity join.

pub mod point;
pub mod relation;

pub use point::{GeoPoint, Point, PointKind, PointRef, PointSet};
pub use relation::{
    Direction, NearestFacilityRecord, NearestRelation, NearestStationRecord, PairDistance,
    PairRecord,
};
