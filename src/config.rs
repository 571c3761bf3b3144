use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::ColumnMapping;
use crate::models::PointKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub stations: InputConfig,
    #[serde(default)]
    pub facilities: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InputConfig {
    pub path: Option<PathBuf>,
    pub columns: Option<ColumnMapping>,
}

impl InputConfig {
    /// Configured columns, or the defaults for this kind of point
    pub fn columns_for(&self, kind: PointKind) -> ColumnMapping {
        self.columns
            .clone()
            .unwrap_or_else(|| ColumnMapping::for_kind(kind))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    pub within_m: Option<f64>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("station_facility_distances")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            within_m: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }
}
