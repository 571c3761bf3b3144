//! Nearest-neighbour reduction over pair rows.

use hashbrown::HashMap;

use crate::models::{Direction, NearestRelation, PairDistance};

/// Reduce pair rows to one minimum-distance row per source point.
///
/// Sources are keyed by (region, input index), so points sharing a name are
/// reduced independently. On an exact distance tie the earliest row wins.
/// Output follows the order in which each source first appears.
pub fn reduce_nearest<'a>(
    pairs: &[PairDistance<'a>],
    direction: Direction,
) -> Vec<NearestRelation<'a>> {
    let mut slots: HashMap<(&'a str, usize), usize> = HashMap::new();
    let mut best: Vec<NearestRelation<'a>> = Vec::new();

    for pair in pairs {
        let candidate = NearestRelation {
            direction,
            pair: *pair,
        };
        let key = (candidate.region(), candidate.source().index);

        match slots.get(&key) {
            Some(&slot) => {
                // Strict comparison keeps the first row on ties
                if pair.distance_m < best[slot].pair.distance_m {
                    best[slot] = candidate;
                }
            }
            None => {
                slots.insert(key, best.len());
                best.push(candidate);
            }
        }
    }

    best
}

/// Nearest facility for every station that has one
pub fn nearest_facility_per_station<'a>(pairs: &[PairDistance<'a>]) -> Vec<NearestRelation<'a>> {
    reduce_nearest(pairs, Direction::FacilityPerStation)
}

/// Nearest station for every facility that has one
pub fn nearest_station_per_facility<'a>(pairs: &[PairDistance<'a>]) -> Vec<NearestRelation<'a>> {
    reduce_nearest(pairs, Direction::StationPerFacility)
}

/// Keep rows whose distance is at most `max_m`, preserving order.
///
/// A negative or NaN threshold keeps nothing.
pub fn within<'a>(relations: &[NearestRelation<'a>], max_m: f64) -> Vec<NearestRelation<'a>> {
    relations
        .iter()
        .filter(|r| r.distance_m() <= max_m)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{join_region, partition_by_region};
    use crate::models::{Point, PointKind, PointSet};

    fn point(name: &str, region: &str, lat: f64, lon: f64) -> Point {
        Point::new(name, region, None, lat, lon).unwrap()
    }

    fn all_pairs<'a>(stations: &'a PointSet, facilities: &'a PointSet) -> Vec<PairDistance<'a>> {
        partition_by_region(stations, facilities)
            .iter()
            .flat_map(join_region)
            .collect()
    }

    #[test]
    fn test_exact_tie_picks_first_in_input_order() {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![point("StationA", "Jung-gu", 37.5700, 127.0000)],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![
                point("FacA", "Jung-gu", 37.5705, 127.0005),
                point("FacB", "Jung-gu", 37.5705, 127.0005),
            ],
        );

        let pairs = all_pairs(&stations, &facilities);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].distance_m, pairs[1].distance_m);
        assert!((pairs[0].distance_m - 70.94).abs() < 0.01);

        for _ in 0..3 {
            let nearest = nearest_facility_per_station(&pairs);
            assert_eq!(nearest.len(), 1);
            assert_eq!(nearest[0].target().point.name, "FacA");
            assert_eq!(nearest[0].target().index, 0);
        }
    }

    #[test]
    fn test_strictly_closer_later_row_wins() {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![point("S", "Mapo-gu", 37.5500, 126.9100)],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![
                point("Far", "Mapo-gu", 37.5600, 126.9300),
                point("Near", "Mapo-gu", 37.5505, 126.9105),
                point("Mid", "Mapo-gu", 37.5550, 126.9150),
            ],
        );

        let pairs = all_pairs(&stations, &facilities);
        let nearest = nearest_facility_per_station(&pairs);
        assert_eq!(nearest[0].target().point.name, "Near");
        for p in &pairs {
            assert!(nearest[0].distance_m() <= p.distance_m);
        }
    }

    #[test]
    fn test_duplicate_names_reduced_independently() {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![
                point("Sinchon", "Mapo-gu", 37.5552, 126.9368),
                point("Sinchon", "Mapo-gu", 37.5598, 126.9426),
            ],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![
                point("West", "Mapo-gu", 37.5551, 126.9367),
                point("East", "Mapo-gu", 37.5599, 126.9427),
            ],
        );

        let pairs = all_pairs(&stations, &facilities);
        let per_station = nearest_facility_per_station(&pairs);
        assert_eq!(per_station.len(), 2);
        assert_eq!(per_station[0].source().index, 0);
        assert_eq!(per_station[0].target().point.name, "West");
        assert_eq!(per_station[1].source().index, 1);
        assert_eq!(per_station[1].target().point.name, "East");
    }

    #[test]
    fn test_nearest_station_per_facility() {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![
                point("S0", "Jung-gu", 37.5600, 126.9800),
                point("S1", "Jung-gu", 37.5700, 127.0000),
            ],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![
                point("F0", "Jung-gu", 37.5701, 127.0001),
                point("F1", "Jung-gu", 37.5601, 126.9801),
                point("F2", "Jung-gu", 37.5650, 126.9900),
            ],
        );

        let pairs = all_pairs(&stations, &facilities);
        let per_facility = nearest_station_per_facility(&pairs);
        let got: Vec<(&str, &str)> = per_facility
            .iter()
            .map(|r| (r.source().point.name.as_str(), r.target().point.name.as_str()))
            .collect();
        assert_eq!(got[0], ("F0", "S1"));
        assert_eq!(got[1], ("F1", "S0"));
        assert_eq!(got.len(), 3);
        assert!(per_facility
            .iter()
            .all(|r| r.direction == Direction::StationPerFacility));
    }

    #[test]
    fn test_empty_pairs() {
        assert!(nearest_facility_per_station(&[]).is_empty());
        assert!(nearest_station_per_facility(&[]).is_empty());
    }

    #[test]
    fn test_within_threshold() {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![point("S", "Jung-gu", 37.5700, 127.0000)],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![
                point("Close", "Jung-gu", 37.5705, 127.0005),
                point("Distant", "Jung-gu", 37.6000, 127.0500),
            ],
        );

        let pairs = all_pairs(&stations, &facilities);
        let per_facility = nearest_station_per_facility(&pairs);

        let kept = within(&per_facility, 1000.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source().point.name, "Close");

        assert!(within(&per_facility, -1.0).is_empty());
        assert!(within(&per_facility, f64::NAN).is_empty());
        assert_eq!(within(&per_facility, f64::INFINITY).len(), 2);
    }
}
