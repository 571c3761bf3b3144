//! Run statistics for a join.

use serde::{Deserialize, Serialize};

/// Per-region counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub stations: usize,
    pub facilities: usize,
    pub pairs: usize,
}

/// Counts for a whole run, written next to the output tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSummary {
    /// Input sizes
    pub stations: usize,
    pub facilities: usize,

    /// Number of regions present in both inputs
    pub shared_regions: usize,

    /// Total pair rows across completed regions
    pub pairs: usize,

    pub nearest_facility_rows: usize,
    pub nearest_station_rows: usize,

    /// Completed regions in key order
    pub regions: Vec<RegionSummary>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub station_only_regions: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub facility_only_regions: Vec<String>,

    /// Shared regions that were never started because the run was cancelled
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cancelled_regions: Vec<String>,
}

impl JoinSummary {
    /// True when no region produced any pair
    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }
}
