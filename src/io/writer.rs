//! CSV/JSON serialization of join results.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use tracing::info;

use crate::join::{within, JoinOutput, JoinSummary, RegionJoin};
use crate::models::{NearestFacilityRecord, NearestStationRecord, PairRecord};

pub const ALL_PAIRS_FILE: &str = "all_pairs.csv";
pub const NEAREST_FACILITY_FILE: &str = "nearest_facility_per_station.csv";
pub const NEAREST_STATION_FILE: &str = "nearest_station_per_facility.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// File name for facilities within `max_m` of their nearest station
pub fn within_file_name(max_m: f64) -> String {
    format!("facilities_within_{}m.csv", max_m)
}

/// Written at the start of every table
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Open a table and write its BOM and header row up front.
fn create_csv(dir: &Path, name: &str, headers: &[&str]) -> Result<Writer<File>> {
    let path = dir.join(name);
    let mut file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(headers)
        .with_context(|| format!("Failed to write header to {}", path.display()))?;
    Ok(writer)
}

/// Writes output tables one region at a time
pub struct OutputWriter {
    dir: PathBuf,
    pairs: Writer<File>,
    nearest_facility: Writer<File>,
    nearest_station: Writer<File>,
    within: Option<(f64, Writer<File>)>,
    rows_written: usize,
}

impl OutputWriter {
    /// Create the output directory and open every table.
    pub fn create(dir: &Path, within_m: Option<f64>) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output dir {}", dir.display()))?;

        let within = match within_m {
            Some(max_m) => {
                let name = within_file_name(max_m);
                Some((max_m, create_csv(dir, &name, &NearestStationRecord::HEADERS)?))
            }
            None => None,
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            pairs: create_csv(dir, ALL_PAIRS_FILE, &PairRecord::HEADERS)?,
            nearest_facility: create_csv(
                dir,
                NEAREST_FACILITY_FILE,
                &NearestFacilityRecord::HEADERS,
            )?,
            nearest_station: create_csv(
                dir,
                NEAREST_STATION_FILE,
                &NearestStationRecord::HEADERS,
            )?,
            within,
            rows_written: 0,
        })
    }

    pub fn write_region(&mut self, region: &RegionJoin<'_>) -> Result<()> {
        for pair in &region.pairs {
            self.pairs.serialize(pair.to_record())?;
        }
        for rel in &region.nearest_facility {
            self.nearest_facility
                .serialize(NearestFacilityRecord::from(rel))?;
        }
        for rel in &region.nearest_station {
            self.nearest_station.serialize(NearestStationRecord::from(rel))?;
        }
        if let Some((max_m, writer)) = &mut self.within {
            for rel in within(&region.nearest_station, *max_m) {
                writer.serialize(NearestStationRecord::from(&rel))?;
            }
        }

        self.rows_written += region.pairs.len();
        Ok(())
    }

    /// Flush every table and write the run summary.
    pub fn finish(mut self, summary: &JoinSummary) -> Result<()> {
        self.pairs.flush()?;
        self.nearest_facility.flush()?;
        self.nearest_station.flush()?;
        if let Some((_, writer)) = &mut self.within {
            writer.flush()?;
        }

        let path = self.dir.join(SUMMARY_FILE);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), summary)?;

        info!(
            "Wrote {} pair rows to {}",
            self.rows_written,
            self.dir.display()
        );
        Ok(())
    }
}

/// Write a finished run in one go.
pub fn write_outputs(dir: &Path, output: &JoinOutput<'_>, within_m: Option<f64>) -> Result<()> {
    let mut writer = OutputWriter::create(dir, within_m)?;
    for region in &output.regions {
        writer.write_region(region)?;
    }
    writer.finish(&output.summary())
}
