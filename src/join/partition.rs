//! Grouping of stations and facilities by region.

use hashbrown::HashMap;

use crate::models::{GeoPoint, PointRef, PointSet};

/// Stations and facilities that share one region key, in input order
#[derive(Debug, Clone)]
pub struct RegionPartition<'a> {
    pub region: &'a str,
    pub stations: Vec<PointRef<'a>>,
    pub facilities: Vec<PointRef<'a>>,
}

impl<'a> RegionPartition<'a> {
    pub fn station_coords(&self) -> Vec<GeoPoint> {
        self.stations.iter().map(|s| s.point.location).collect()
    }

    pub fn facility_coords(&self) -> Vec<GeoPoint> {
        self.facilities.iter().map(|f| f.point.location).collect()
    }

    /// Number of pairs this region contributes
    pub fn pair_count(&self) -> usize {
        self.stations.len() * self.facilities.len()
    }
}

/// Full result of grouping both sets, including regions that only one side has
#[derive(Debug, Clone, Default)]
pub struct Partitioning<'a> {
    /// Regions present on both sides, sorted by key
    pub shared: Vec<RegionPartition<'a>>,
    /// Regions with stations but no facilities, sorted
    pub station_only: Vec<&'a str>,
    /// Regions with facilities but no stations, sorted
    pub facility_only: Vec<&'a str>,
    /// Size of the station input, including one-sided regions
    pub stations: usize,
    /// Size of the facility input, including one-sided regions
    pub facilities: usize,
}

impl Partitioning<'_> {
    /// Number of regions the join will visit
    pub fn region_count(&self) -> usize {
        self.shared.len()
    }
}

fn group_by_region(set: &PointSet) -> HashMap<&str, Vec<PointRef<'_>>> {
    let mut groups: HashMap<&str, Vec<PointRef<'_>>> = HashMap::new();
    for p in set.iter() {
        groups.entry(p.region()).or_default().push(p);
    }
    groups
}

/// Group both sets by region and split shared from one-sided regions.
pub fn partition<'a>(stations: &'a PointSet, facilities: &'a PointSet) -> Partitioning<'a> {
    let mut station_groups = group_by_region(stations);
    let mut facility_groups = group_by_region(facilities);

    let mut shared = Vec::new();
    let mut station_only = Vec::new();

    for (region, region_stations) in station_groups.drain() {
        match facility_groups.remove(region) {
            Some(region_facilities)
                if !region_stations.is_empty() && !region_facilities.is_empty() =>
            {
                shared.push(RegionPartition {
                    region,
                    stations: region_stations,
                    facilities: region_facilities,
                });
            }
            _ => station_only.push(region),
        }
    }

    let mut facility_only: Vec<&str> = facility_groups.into_keys().collect();

    shared.sort_unstable_by(|a, b| a.region.cmp(b.region));
    station_only.sort_unstable();
    facility_only.sort_unstable();

    Partitioning {
        shared,
        station_only,
        facility_only,
        stations: stations.len(),
        facilities: facilities.len(),
    }
}

/// Regions present in both sets, sorted by key, with their members.
pub fn partition_by_region<'a>(
    stations: &'a PointSet,
    facilities: &'a PointSet,
) -> Vec<RegionPartition<'a>> {
    partition(stations, facilities).shared
}

/// Sorted region keys present in both sets
pub fn shared_regions<'a>(stations: &'a PointSet, facilities: &'a PointSet) -> Vec<&'a str> {
    partition_by_region(stations, facilities)
        .into_iter()
        .map(|p| p.region)
        .collect()
}
