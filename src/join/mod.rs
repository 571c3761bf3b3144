//! Region-restricted proximity join.
//!
//! Stations and facilities are only ever paired inside a shared region.
//! The stages are: partition by region, all-pairs distances per region,
//! then reduction to the nearest counterpart in each direction.

mod engine;
mod nearest;
mod pairwise;
mod partition;
mod summary;

pub use engine::{CancelFlag, JoinOptions, JoinOutput, ProximityEngine, RegionJoin};
pub use nearest::{
    nearest_facility_per_station, nearest_station_per_facility, reduce_nearest, within,
};
pub use pairwise::join_region;
pub use partition::{
    partition, partition_by_region, shared_regions, Partitioning, RegionPartition,
};
pub use summary::{JoinSummary, RegionSummary};

use crate::models::PointSet;

/// Run the join with default options (parallel over regions).
pub fn compute<'a>(stations: &'a PointSet, facilities: &'a PointSet) -> JoinOutput<'a> {
    ProximityEngine::default().run(stations, facilities)
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::models::{Point, PointKind};
    use proptest::prelude::*;

    const REGIONS: [&str; 4] = ["Jung-gu", "Mapo-gu", "Gangnam-gu", "Dobong-gu"];

    fn points(kind: PointKind) -> impl Strategy<Value = PointSet> {
        prop::collection::vec((0usize..4, 37.40f64..37.70, 126.80f64..127.20), 0..12).prop_map(
            move |rows| {
                let points = rows
                    .into_iter()
                    .enumerate()
                    .map(|(i, (r, lat, lon))| {
                        Point::new(format!("{kind}-{i}"), REGIONS[r], None, lat, lon).unwrap()
                    })
                    .collect();
                PointSet::from_points(kind, points)
            },
        )
    }

    proptest! {
        /// N x M rows per shared region, and no row crosses regions
        #[test]
        fn pair_count_and_isolation(
            stations in points(PointKind::Station),
            facilities in points(PointKind::Facility),
        ) {
            let out = compute(&stations, &facilities);

            for region in &out.regions {
                let n = stations.iter().filter(|s| s.region() == region.region).count();
                let m = facilities.iter().filter(|f| f.region() == region.region).count();
                prop_assert_eq!(region.pairs.len(), n * m);
            }
            for pair in out.all_pairs() {
                prop_assert_eq!(&pair.station.point.region, &pair.facility.point.region);
            }
        }

        /// Every station in a shared region gets exactly one nearest row,
        /// and that row is no farther than any other row for the station
        #[test]
        fn nearest_is_minimum_and_unique(
            stations in points(PointKind::Station),
            facilities in points(PointKind::Facility),
        ) {
            let out = compute(&stations, &facilities);
            let shared = out.shared_regions();

            for s in stations.iter() {
                let rows: Vec<_> = out
                    .nearest_facility_per_station()
                    .filter(|r| r.source().index == s.index)
                    .collect();
                let expected = usize::from(shared.contains(&s.region()));
                prop_assert_eq!(rows.len(), expected);

                if let Some(best) = rows.first() {
                    for p in out.all_pairs().filter(|p| p.station.index == s.index) {
                        prop_assert!(best.distance_m() <= p.distance_m);
                    }
                }
            }
        }
    }
}
