//! Catchment - region-restricted station/facility proximity join
//!
//! Pairs every station with every facility in the same administrative
//! region, measures haversine distance, and reduces the pairs to the nearest
//! facility per station and the nearest station per facility.

pub mod config;
pub mod distance;
pub mod error;
pub mod io;
pub mod join;
pub mod models;

pub use error::{CatchmentError, Result};
pub use join::{compute, JoinOptions, JoinOutput, ProximityEngine};
pub use models::{GeoPoint, Point, PointKind, PointSet};
