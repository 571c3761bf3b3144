//! File I/O around the join: CSV point loading and result writing.

mod loader;
mod writer;

pub use loader::{load_points, read_points, ColumnMapping, LoadReport};
pub use writer::{
    within_file_name, write_outputs, OutputWriter, ALL_PAIRS_FILE, NEAREST_FACILITY_FILE,
    NEAREST_STATION_FILE, SUMMARY_FILE,
};
