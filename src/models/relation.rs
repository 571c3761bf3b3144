//! Join output rows and their flat CSV/JSON record forms.

use serde::{Deserialize, Serialize};

use super::PointRef;

/// One same-region (station, facility, distance) row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairDistance<'a> {
    pub station: PointRef<'a>,
    pub facility: PointRef<'a>,
    pub distance_m: f64,
}

impl<'a> PairDistance<'a> {
    /// Region shared by both ends of the pair
    pub fn region(&self) -> &'a str {
        self.station.region()
    }

    pub fn to_record(&self) -> PairRecord {
        let s = self.station.point;
        let f = self.facility.point;
        PairRecord {
            region: s.region.clone(),
            station_row: self.station.index,
            station_name: s.name.clone(),
            station_line: s.attribute.clone(),
            station_lat: s.lat(),
            station_lon: s.lon(),
            facility_row: self.facility.index,
            facility_name: f.name.clone(),
            facility_category: f.attribute.clone(),
            facility_lat: f.lat(),
            facility_lon: f.lon(),
            distance_m: self.distance_m,
        }
    }
}

/// Which side of a pair is the grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Keyed by station, target is the nearest facility
    FacilityPerStation,
    /// Keyed by facility, target is the nearest station
    StationPerFacility,
}

/// The minimum-distance pair for one source point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestRelation<'a> {
    pub direction: Direction,
    pub pair: PairDistance<'a>,
}

impl<'a> NearestRelation<'a> {
    pub fn region(&self) -> &'a str {
        self.pair.region()
    }

    pub fn distance_m(&self) -> f64 {
        self.pair.distance_m
    }

    /// The point this row is keyed by
    pub fn source(&self) -> PointRef<'a> {
        match self.direction {
            Direction::FacilityPerStation => self.pair.station,
            Direction::StationPerFacility => self.pair.facility,
        }
    }

    /// The matched counterpart
    pub fn target(&self) -> PointRef<'a> {
        match self.direction {
            Direction::FacilityPerStation => self.pair.facility,
            Direction::StationPerFacility => self.pair.station,
        }
    }
}

/// Flat form of a `PairDistance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub region: String,
    pub station_row: usize,
    pub station_name: String,
    pub station_line: Option<String>,
    pub station_lat: f64,
    pub station_lon: f64,
    pub facility_row: usize,
    pub facility_name: String,
    pub facility_category: Option<String>,
    pub facility_lat: f64,
    pub facility_lon: f64,
    pub distance_m: f64,
}

impl PairRecord {
    /// Column names in serialization order
    pub const HEADERS: [&'static str; 12] = [
        "region",
        "station_row",
        "station_name",
        "station_line",
        "station_lat",
        "station_lon",
        "facility_row",
        "facility_name",
        "facility_category",
        "facility_lat",
        "facility_lon",
        "distance_m",
    ];
}

/// Station enriched with its nearest facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestFacilityRecord {
    pub region: String,
    pub station_row: usize,
    pub station_name: String,
    pub station_line: Option<String>,
    pub station_lat: f64,
    pub station_lon: f64,
    pub nearest_facility_row: usize,
    pub nearest_facility_name: String,
    pub nearest_facility_category: Option<String>,
    pub nearest_facility_lat: f64,
    pub nearest_facility_lon: f64,
    pub nearest_facility_m: f64,
}

impl NearestFacilityRecord {
    /// Column names in serialization order
    pub const HEADERS: [&'static str; 12] = [
        "region",
        "station_row",
        "station_name",
        "station_line",
        "station_lat",
        "station_lon",
        "nearest_facility_row",
        "nearest_facility_name",
        "nearest_facility_category",
        "nearest_facility_lat",
        "nearest_facility_lon",
        "nearest_facility_m",
    ];
}

/// Facility enriched with its nearest station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestStationRecord {
    pub region: String,
    pub facility_row: usize,
    pub facility_name: String,
    pub facility_category: Option<String>,
    pub facility_lat: f64,
    pub facility_lon: f64,
    pub nearest_station_row: usize,
    pub nearest_station_name: String,
    pub nearest_station_line: Option<String>,
    pub nearest_station_lat: f64,
    pub nearest_station_lon: f64,
    pub nearest_station_m: f64,
}

impl NearestStationRecord {
    /// Column names in serialization order
    pub const HEADERS: [&'static str; 12] = [
        "region",
        "facility_row",
        "facility_name",
        "facility_category",
        "facility_lat",
        "facility_lon",
        "nearest_station_row",
        "nearest_station_name",
        "nearest_station_line",
        "nearest_station_lat",
        "nearest_station_lon",
        "nearest_station_m",
    ];
}

impl From<&NearestRelation<'_>> for NearestFacilityRecord {
    fn from(rel: &NearestRelation<'_>) -> Self {
        let PairRecord {
            region,
            station_row,
            station_name,
            station_line,
            station_lat,
            station_lon,
            facility_row,
            facility_name,
            facility_category,
            facility_lat,
            facility_lon,
            distance_m,
        } = rel.pair.to_record();

        Self {
            region,
            station_row,
            station_name,
            station_line,
            station_lat,
            station_lon,
            nearest_facility_row: facility_row,
            nearest_facility_name: facility_name,
            nearest_facility_category: facility_category,
            nearest_facility_lat: facility_lat,
            nearest_facility_lon: facility_lon,
            nearest_facility_m: distance_m,
        }
    }
}

impl From<&NearestRelation<'_>> for NearestStationRecord {
    fn from(rel: &NearestRelation<'_>) -> Self {
        let PairRecord {
            region,
            station_row,
            station_name,
            station_line,
            station_lat,
            station_lon,
            facility_row,
            facility_name,
            facility_category,
            facility_lat,
            facility_lon,
            distance_m,
        } = rel.pair.to_record();

        Self {
            region,
            facility_row,
            facility_name,
            facility_category,
            facility_lat,
            facility_lon,
            nearest_station_row: station_row,
            nearest_station_name: station_name,
            nearest_station_line: station_line,
            nearest_station_lat: station_lat,
            nearest_station_lon: station_lon,
            nearest_station_m: distance_m,
        }
    }
}
