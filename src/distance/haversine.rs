use crate::models::GeoPoint;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/lon pairs (degrees).
///
/// No bounds checking is done. NaN input gives a NaN distance.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_distance(
        lat1,
        lon1,
        lat1.to_radians().cos(),
        lat2,
        lon2,
        lat2.to_radians().cos(),
    )
}

/// Shared per-cell arithmetic so the matrix form matches the scalar form bit for bit.
#[inline]
fn central_distance(
    lat1: f64,
    lon1: f64,
    cos_lat1: f64,
    lat2: f64,
    lon2: f64,
    cos_lat2: f64,
) -> f64 {
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + cos_lat1 * cos_lat2 * (dlambda / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1.0 for near-antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Row-major N×M distance matrix: rows are sources, columns are targets
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Distances from source `row` to every target
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.rows {
            Some(&self.data[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }

    /// Iterate cells as `(row, col, distance)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let cols = self.cols;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, d)| (i / cols, i % cols, *d))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Broadcast haversine over every (source, target) combination.
pub fn haversine_matrix(sources: &[GeoPoint], targets: &[GeoPoint]) -> DistanceMatrix {
    let target_cos: Vec<f64> = targets.iter().map(|t| t.lat.to_radians().cos()).collect();

    let mut data = Vec::with_capacity(sources.len() * targets.len());
    for s in sources {
        let source_cos = s.lat.to_radians().cos();
        for (t, t_cos) in targets.iter().zip(&target_cos) {
            data.push(central_distance(s.lat, s.lon, source_cos, t.lat, t.lon, *t_cos));
        }
    }

    DistanceMatrix {
        rows: sources.len(),
        cols: targets.len(),
        data,
    }
}
