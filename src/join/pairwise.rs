//! All-pairs distance rows for one region.

use crate::distance::haversine_matrix;
use crate::models::PairDistance;

use super::RegionPartition;

/// Build every (station, facility) row for a region.
///
/// Rows come out station-major: stations in input order, and for each
/// station the facilities in input order. The nearest-neighbour tie-break
/// depends on this order.
pub fn join_region<'a>(partition: &RegionPartition<'a>) -> Vec<PairDistance<'a>> {
    let matrix = haversine_matrix(&partition.station_coords(), &partition.facility_coords());

    matrix
        .iter()
        .map(|(i, j, distance_m)| PairDistance {
            station: partition.stations[i],
            facility: partition.facilities[j],
            distance_m,
        })
        .collect()
}
