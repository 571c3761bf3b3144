//! Station/facility pairing pipeline.
//!
//! Loads station and facility tables, joins them within each region, and
//! writes all pairs plus both nearest-neighbour tables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use catchment::config::Config;
use catchment::io::{load_points, write_outputs, OutputWriter};
use catchment::join::{JoinOptions, ProximityEngine};
use catchment::models::PointKind;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "pair")]
#[command(about = "Pair stations with facilities in the same region")]
struct Args {
    /// TOML config with input paths, column names, and output settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Station CSV (overrides config)
    #[arg(long)]
    stations: Option<PathBuf>,

    /// Facility CSV (overrides config)
    #[arg(long)]
    facilities: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Also write facilities within this many meters of their nearest station
    #[arg(long)]
    within: Option<f64>,

    /// Worker threads for the region pool
    #[arg(long)]
    threads: Option<usize>,

    /// Process regions one at a time, writing each as it finishes
    #[arg(long)]
    sequential: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => {
            info!("Config: {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };

    let stations_path = args
        .stations
        .clone()
        .or_else(|| config.stations.path.clone())
        .context("No station file given (use --stations or [stations] path)")?;
    let facilities_path = args
        .facilities
        .clone()
        .or_else(|| config.facilities.path.clone())
        .context("No facility file given (use --facilities or [facilities] path)")?;
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| config.output.dir.clone());
    let within = args.within.or(config.output.within_m);

    if let Some(m) = within {
        if m.is_nan() || m < 0.0 {
            anyhow::bail!("--within must be a non-negative distance, got {}", m);
        }
    }

    let stations = load_points(
        &stations_path,
        PointKind::Station,
        &config.stations.columns_for(PointKind::Station),
    )?
    .points;
    let facilities = load_points(
        &facilities_path,
        PointKind::Facility,
        &config.facilities.columns_for(PointKind::Facility),
    )?
    .points;

    let engine = ProximityEngine::new(JoinOptions {
        parallel: !args.sequential,
        threads: args.threads,
        cancel: None,
    });
    let plan = engine.plan(&stations, &facilities);

    let pb = ProgressBar::new(plan.region_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} regions",
            )?
            .progress_chars("#>-"),
    );

    let summary = if args.sequential {
        let mut writer = OutputWriter::create(&out_dir, within)?;
        let summary = engine.stream_plan(plan, |region| {
            writer.write_region(&region)?;
            pb.inc(1);
            Ok::<(), anyhow::Error>(())
        })?;
        writer.finish(&summary)?;
        summary
    } else {
        let output = engine.run_plan(plan, |_| pb.inc(1));
        write_outputs(&out_dir, &output, within)?;
        output.summary()
    };

    pb.finish_with_message("Join complete");

    if summary.is_empty() {
        warn!("No station/facility pairs: the inputs share no region");
    }

    info!(
        "{} regions, {} pairs, {} stations matched, {} facilities matched",
        summary.shared_regions,
        summary.pairs,
        summary.nearest_facility_rows,
        summary.nearest_station_rows
    );
    info!("Results written to {}", out_dir.display());

    Ok(())
}
