//! Great-circle distance on a spherical Earth.
//!
//! Provides the scalar haversine form and a broadcast form that fills an
//! N×M matrix for a whole region at once.

mod haversine;

pub use haversine::{haversine_m, haversine_matrix, DistanceMatrix, EARTH_RADIUS_M};
