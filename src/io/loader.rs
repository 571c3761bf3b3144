//! CSV ingestion of station and facility tables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{Point, PointKind, PointSet};

/// Column names to read each point field from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: String,
    pub region: String,
    /// Subway line or facility category; optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub lat: String,
    pub lon: String,
}

impl ColumnMapping {
    /// Seoul Metro station export: 역명, 자치구, 호선, 위도, 경도
    pub fn stations() -> Self {
        Self {
            name: "역명".into(),
            region: "자치구".into(),
            attribute: Some("호선".into()),
            lat: "위도".into(),
            lon: "경도".into(),
        }
    }

    /// Culture/sports/tourism facility export: POI_NM, SIGNGU_NM, CL_NM, 위도, 경도
    pub fn facilities() -> Self {
        Self {
            name: "POI_NM".into(),
            region: "SIGNGU_NM".into(),
            attribute: Some("CL_NM".into()),
            lat: "위도".into(),
            lon: "경도".into(),
        }
    }

    pub fn for_kind(kind: PointKind) -> Self {
        match kind {
            PointKind::Station => Self::stations(),
            PointKind::Facility => Self::facilities(),
        }
    }
}

/// Loaded points plus how many rows were dropped
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub points: PointSet,
    /// Rows with a blank name or region, or an unparseable/out-of-range coordinate
    pub skipped: usize,
}

struct ColumnIndices {
    name: usize,
    region: usize,
    attribute: Option<usize>,
    lat: usize,
    lon: usize,
}

impl ColumnIndices {
    fn resolve(headers: &StringRecord, mapping: &ColumnMapping) -> Result<Self> {
        // Headers are matched after trimming whitespace and a leading BOM
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == column)
                .with_context(|| format!("Column '{}' not found", column))
        };

        Ok(Self {
            name: find(&mapping.name)?,
            region: find(&mapping.region)?,
            attribute: mapping.attribute.as_deref().map(find).transpose()?,
            lat: find(&mapping.lat)?,
            lon: find(&mapping.lon)?,
        })
    }
}

fn parse_row(record: &StringRecord, cols: &ColumnIndices) -> Option<Point> {
    let cell = |i: usize| record.get(i).unwrap_or("");

    let lat = cell(cols.lat).parse::<f64>().ok()?;
    let lon = cell(cols.lon).parse::<f64>().ok()?;
    let attribute = cols.attribute.map(|i| cell(i).to_string());

    match Point::new(cell(cols.name), cell(cols.region), attribute, lat, lon) {
        Ok(point) => Some(point),
        Err(e) => {
            debug!("Skipping row: {}", e);
            None
        }
    }
}

/// Read points of one kind from any CSV source.
pub fn read_points<R: Read>(
    reader: R,
    kind: PointKind,
    mapping: &ColumnMapping,
) -> Result<LoadReport> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let cols = ColumnIndices::resolve(&headers, mapping)?;

    let mut points = PointSet::new(kind);
    let mut skipped = 0;

    for (line, result) in csv_reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read {} row {}", kind, line + 1))?;
        match parse_row(&record, &cols) {
            Some(point) => {
                points.push(point);
            }
            None => skipped += 1,
        }
    }

    Ok(LoadReport { points, skipped })
}

/// Load points from a CSV file, decompressing `*.gz` transparently.
pub fn load_points(path: &Path, kind: PointKind, mapping: &ColumnMapping) -> Result<LoadReport> {
    info!("Loading {}s from {}", kind, path.display());

    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file {}", kind, path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let report = read_points(reader, kind, mapping)?;

    info!("Loaded {} {}s", report.points.len(), kind);
    if report.skipped > 0 {
        warn!(
            "Skipped {} {} rows with missing region, name, or coordinates",
            report.skipped, kind
        );
    }

    Ok(report)
}
