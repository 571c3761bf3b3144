//! Region-by-region orchestration of the join.
//!
//! Regions are independent, so the engine either fans them out over the
//! rayon pool or walks them one at a time and hands each finished region to
//! a sink. Either way the result is a union of per-region pieces, which
//! means a cancelled run still yields every region that completed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use super::nearest::{nearest_facility_per_station, nearest_station_per_facility, within};
use super::{join_region, partition, JoinSummary, Partitioning, RegionPartition, RegionSummary};
use crate::models::{NearestRelation, PairDistance, PointSet};

/// Shared flag checked before each region starts
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Engine settings
#[derive(Debug, Clone)]
pub struct JoinOptions {
    /// Process regions on the rayon pool
    pub parallel: bool,
    /// Size of a dedicated pool; `None` uses the global pool
    pub threads: Option<usize>,
    pub cancel: Option<CancelFlag>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            cancel: None,
        }
    }
}

/// Everything computed for one shared region
#[derive(Debug, Clone)]
pub struct RegionJoin<'a> {
    pub region: &'a str,
    pub stations: usize,
    pub facilities: usize,
    pub pairs: Vec<PairDistance<'a>>,
    pub nearest_facility: Vec<NearestRelation<'a>>,
    pub nearest_station: Vec<NearestRelation<'a>>,
}

impl<'a> RegionJoin<'a> {
    /// Distance matrix, flattened rows, and both reductions for one region
    pub fn compute(partition: &RegionPartition<'a>) -> Self {
        let pairs = join_region(partition);
        let nearest_facility = nearest_facility_per_station(&pairs);
        let nearest_station = nearest_station_per_facility(&pairs);

        debug!(
            "Region {}: {} stations x {} facilities = {} pairs",
            partition.region,
            partition.stations.len(),
            partition.facilities.len(),
            pairs.len()
        );

        Self {
            region: partition.region,
            stations: partition.stations.len(),
            facilities: partition.facilities.len(),
            pairs,
            nearest_facility,
            nearest_station,
        }
    }

    pub fn summary(&self) -> RegionSummary {
        RegionSummary {
            region: self.region.to_string(),
            stations: self.stations,
            facilities: self.facilities,
            pairs: self.pairs.len(),
        }
    }
}

/// Result of a full run, ordered by region key
#[derive(Debug, Clone)]
pub struct JoinOutput<'a> {
    pub regions: Vec<RegionJoin<'a>>,
    pub station_only_regions: Vec<&'a str>,
    pub facility_only_regions: Vec<&'a str>,
    pub cancelled_regions: Vec<&'a str>,
    stations: usize,
    facilities: usize,
}

impl<'a> JoinOutput<'a> {
    /// Every same-region pair, region order then station-major order
    pub fn all_pairs(&self) -> impl Iterator<Item = &PairDistance<'a>> + '_ {
        self.regions.iter().flat_map(|r| r.pairs.iter())
    }

    pub fn nearest_facility_per_station(&self) -> impl Iterator<Item = &NearestRelation<'a>> + '_ {
        self.regions.iter().flat_map(|r| r.nearest_facility.iter())
    }

    pub fn nearest_station_per_facility(&self) -> impl Iterator<Item = &NearestRelation<'a>> + '_ {
        self.regions.iter().flat_map(|r| r.nearest_station.iter())
    }

    /// Facilities whose nearest station is at most `max_m` away
    pub fn nearest_station_within(&self, max_m: f64) -> Vec<NearestRelation<'a>> {
        self.regions
            .iter()
            .flat_map(|r| within(&r.nearest_station, max_m))
            .collect()
    }

    /// Regions present in both inputs, including cancelled ones
    pub fn shared_regions(&self) -> Vec<&'a str> {
        let mut regions: Vec<&str> = self
            .regions
            .iter()
            .map(|r| r.region)
            .chain(self.cancelled_regions.iter().copied())
            .collect();
        regions.sort_unstable();
        regions
    }

    /// True when no pair was produced, e.g. the inputs share no region
    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(|r| r.pairs.is_empty())
    }

    pub fn summary(&self) -> JoinSummary {
        let mut summary = SummaryBuilder::new(self.stations, self.facilities);
        for r in &self.regions {
            summary.add(r);
        }
        summary.finish(
            &self.station_only_regions,
            &self.facility_only_regions,
            &self.cancelled_regions,
        )
    }
}

struct SummaryBuilder {
    inner: JoinSummary,
}

impl SummaryBuilder {
    fn new(stations: usize, facilities: usize) -> Self {
        Self {
            inner: JoinSummary {
                stations,
                facilities,
                ..JoinSummary::default()
            },
        }
    }

    fn add(&mut self, region: &RegionJoin<'_>) {
        self.inner.pairs += region.pairs.len();
        self.inner.nearest_facility_rows += region.nearest_facility.len();
        self.inner.nearest_station_rows += region.nearest_station.len();
        self.inner.regions.push(region.summary());
    }

    fn finish(
        mut self,
        station_only: &[&str],
        facility_only: &[&str],
        cancelled: &[&str],
    ) -> JoinSummary {
        self.inner.shared_regions = self.inner.regions.len() + cancelled.len();
        self.inner.station_only_regions = station_only.iter().map(|s| s.to_string()).collect();
        self.inner.facility_only_regions = facility_only.iter().map(|s| s.to_string()).collect();
        self.inner.cancelled_regions = cancelled.iter().map(|s| s.to_string()).collect();
        self.inner
    }
}

/// A finished region, or the key of a region skipped after cancellation
type Outcome<'a> = Result<RegionJoin<'a>, &'a str>;

/// Drives partition, pairwise join, and reduction over all regions
#[derive(Debug, Clone, Default)]
pub struct ProximityEngine {
    options: JoinOptions,
}

impl ProximityEngine {
    pub fn new(options: JoinOptions) -> Self {
        Self { options }
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .map(CancelFlag::is_cancelled)
            .unwrap_or(false)
    }

    /// Partition both sets by region.
    ///
    /// The result can be inspected (region count for progress reporting)
    /// and then handed to [`run_plan`](Self::run_plan) or
    /// [`stream_plan`](Self::stream_plan) without grouping the inputs again.
    pub fn plan<'a>(&self, stations: &'a PointSet, facilities: &'a PointSet) -> Partitioning<'a> {
        let parts = partition(stations, facilities);

        info!(
            "Joining {} stations and {} facilities over {} shared regions",
            parts.stations,
            parts.facilities,
            parts.region_count()
        );
        for region in &parts.station_only {
            debug!("Region {} has stations but no facilities, skipping", region);
        }
        for region in &parts.facility_only {
            debug!("Region {} has facilities but no stations, skipping", region);
        }
        if parts.shared.is_empty() {
            warn!("Station and facility sets share no region; output will be empty");
        }

        parts
    }

    /// Compute every region and collect the results.
    pub fn run<'a>(&self, stations: &'a PointSet, facilities: &'a PointSet) -> JoinOutput<'a> {
        self.run_with_progress(stations, facilities, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_region` as each region finishes.
    ///
    /// With parallel execution the callback fires from worker threads in
    /// completion order; the returned output is still in key order.
    pub fn run_with_progress<'a, F>(
        &self,
        stations: &'a PointSet,
        facilities: &'a PointSet,
        on_region: F,
    ) -> JoinOutput<'a>
    where
        F: Fn(&RegionJoin<'a>) + Sync,
    {
        self.run_plan(self.plan(stations, facilities), on_region)
    }

    /// Compute every region of an existing plan, calling `on_region` as each
    /// one finishes.
    pub fn run_plan<'a, F>(&self, parts: Partitioning<'a>, on_region: F) -> JoinOutput<'a>
    where
        F: Fn(&RegionJoin<'a>) + Sync,
    {

        let process = |p: &RegionPartition<'a>| -> Outcome<'a> {
            if self.is_cancelled() {
                return Err(p.region);
            }
            let joined = RegionJoin::compute(p);
            on_region(&joined);
            Ok(joined)
        };

        let outcomes: Vec<Outcome<'a>> = if self.options.parallel {
            let run_parallel =
                || -> Vec<Outcome<'a>> { parts.shared.par_iter().map(process).collect() };
            match self.options.threads {
                Some(n) => match ThreadPoolBuilder::new().num_threads(n).build() {
                    Ok(pool) => pool.install(run_parallel),
                    Err(e) => {
                        warn!("Failed to build a {}-thread pool ({}), using global pool", n, e);
                        run_parallel()
                    }
                },
                None => run_parallel(),
            }
        } else {
            parts.shared.iter().map(process).collect()
        };

        let mut regions = Vec::with_capacity(outcomes.len());
        let mut cancelled_regions = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(joined) => regions.push(joined),
                Err(region) => cancelled_regions.push(region),
            }
        }

        if !cancelled_regions.is_empty() {
            warn!(
                "Run cancelled: {} of {} regions completed",
                regions.len(),
                regions.len() + cancelled_regions.len()
            );
        }

        let output = JoinOutput {
            regions,
            station_only_regions: parts.station_only,
            facility_only_regions: parts.facility_only,
            cancelled_regions,
            stations: parts.stations,
            facilities: parts.facilities,
        };

        info!(
            "Produced {} pairs across {} regions",
            output.all_pairs().count(),
            output.regions.len()
        );

        output
    }

    /// Process regions one at a time in key order, handing each to `sink`.
    ///
    /// Only one region's rows are alive at once. The first sink error stops
    /// the run and is returned.
    pub fn stream<'a, F, E>(
        &self,
        stations: &'a PointSet,
        facilities: &'a PointSet,
        sink: F,
    ) -> Result<JoinSummary, E>
    where
        F: FnMut(RegionJoin<'a>) -> Result<(), E>,
    {
        self.stream_plan(self.plan(stations, facilities), sink)
    }

    /// [`stream`](Self::stream) over an existing plan.
    pub fn stream_plan<'a, F, E>(
        &self,
        parts: Partitioning<'a>,
        mut sink: F,
    ) -> Result<JoinSummary, E>
    where
        F: FnMut(RegionJoin<'a>) -> Result<(), E>,
    {
        let mut summary = SummaryBuilder::new(parts.stations, parts.facilities);
        let mut cancelled = Vec::new();

        for p in &parts.shared {
            if self.is_cancelled() {
                cancelled.push(p.region);
                continue;
            }
            let joined = RegionJoin::compute(p);
            summary.add(&joined);
            sink(joined)?;
        }

        if !cancelled.is_empty() {
            warn!(
                "Run cancelled: {} of {} regions completed",
                parts.shared.len() - cancelled.len(),
                parts.shared.len()
            );
        }

        Ok(summary.finish(&parts.station_only, &parts.facility_only, &cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Point, PointKind};

    fn point(name: &str, region: &str, lat: f64, lon: f64) -> Point {
        Point::new(name, region, None, lat, lon).unwrap()
    }

    fn seoul_sets() -> (PointSet, PointSet) {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![
                point("StationA", "Jung-gu", 37.5700, 127.0000),
                point("Gangnam", "Gangnam-gu", 37.4979, 127.0276),
                point("Hapjeong", "Mapo-gu", 37.5496, 126.9139),
                point("Sinchon", "Mapo-gu", 37.5552, 126.9368),
            ],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![
                point("FacA", "Jung-gu", 37.5705, 127.0005),
                point("Gallery", "Mapo-gu", 37.5500, 126.9140),
                point("FacB", "Jung-gu", 37.5705, 127.0005),
                point("Library", "Dobong-gu", 37.6688, 127.0471),
            ],
        );
        (stations, facilities)
    }

    #[test]
    fn test_run_counts_and_isolation() {
        let (stations, facilities) = seoul_sets();
        let out = ProximityEngine::default().run(&stations, &facilities);

        assert_eq!(out.shared_regions(), vec!["Jung-gu", "Mapo-gu"]);
        assert_eq!(out.regions[0].pairs.len(), 2);
        assert_eq!(out.regions[1].pairs.len(), 2);
        assert_eq!(out.all_pairs().count(), 4);
        assert!(out
            .all_pairs()
            .all(|p| p.station.point.region == p.facility.point.region));

        // Gangnam-gu has no facilities and never shows up
        assert!(out.all_pairs().all(|p| p.station.point.name != "Gangnam"));
        assert!(out
            .nearest_facility_per_station()
            .all(|r| r.source().point.name != "Gangnam"));
        assert_eq!(out.station_only_regions, vec!["Gangnam-gu"]);
        assert_eq!(out.facility_only_regions, vec!["Dobong-gu"]);
    }

    #[test]
    fn test_run_nearest_relations() {
        let (stations, facilities) = seoul_sets();
        let out = ProximityEngine::default().run(&stations, &facilities);

        let per_station: Vec<(&str, &str)> = out
            .nearest_facility_per_station()
            .map(|r| (r.source().point.name.as_str(), r.target().point.name.as_str()))
            .collect();
        assert_eq!(
            per_station,
            vec![
                ("StationA", "FacA"),
                ("Hapjeong", "Gallery"),
                ("Sinchon", "Gallery"),
            ]
        );

        let per_facility: Vec<(&str, &str)> = out
            .nearest_station_per_facility()
            .map(|r| (r.source().point.name.as_str(), r.target().point.name.as_str()))
            .collect();
        assert_eq!(
            per_facility,
            vec![
                ("FacA", "StationA"),
                ("FacB", "StationA"),
                ("Gallery", "Hapjeong"),
            ]
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (stations, facilities) = seoul_sets();
        let par = ProximityEngine::default().run(&stations, &facilities);
        let seq = ProximityEngine::new(JoinOptions {
            parallel: false,
            ..JoinOptions::default()
        })
        .run(&stations, &facilities);
        let pooled = ProximityEngine::new(JoinOptions {
            threads: Some(2),
            ..JoinOptions::default()
        })
        .run(&stations, &facilities);

        let a: Vec<_> = par.all_pairs().copied().collect();
        let b: Vec<_> = seq.all_pairs().copied().collect();
        let c: Vec<_> = pooled.all_pairs().copied().collect();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(par.summary(), seq.summary());
    }

    #[test]
    fn test_empty_intersection_is_not_an_error() {
        let stations = PointSet::from_points(
            PointKind::Station,
            vec![point("Gangnam", "Gangnam-gu", 37.4979, 127.0276)],
        );
        let facilities = PointSet::from_points(
            PointKind::Facility,
            vec![point("Library", "Dobong-gu", 37.6688, 127.0471)],
        );

        let out = ProximityEngine::default().run(&stations, &facilities);
        assert!(out.is_empty());
        assert!(out.shared_regions().is_empty());
        assert_eq!(out.all_pairs().count(), 0);
        assert_eq!(out.nearest_facility_per_station().count(), 0);
        assert_eq!(out.nearest_station_per_facility().count(), 0);
        assert!(out.summary().is_empty());
    }

    #[test]
    fn test_cancelled_run_keeps_nothing_and_reports_regions() {
        let (stations, facilities) = seoul_sets();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let engine = ProximityEngine::new(JoinOptions {
            cancel: Some(cancel),
            ..JoinOptions::default()
        });
        let out = engine.run(&stations, &facilities);
        assert!(out.regions.is_empty());
        assert_eq!(out.cancelled_regions, vec!["Jung-gu", "Mapo-gu"]);
        assert_eq!(out.shared_regions(), vec!["Jung-gu", "Mapo-gu"]);
        assert_eq!(out.summary().cancelled_regions.len(), 2);
        assert_eq!(out.summary().shared_regions, 2);
    }

    #[test]
    fn test_cancel_mid_stream_keeps_completed_regions() {
        let (stations, facilities) = seoul_sets();
        let cancel = CancelFlag::new();
        let engine = ProximityEngine::new(JoinOptions {
            parallel: false,
            cancel: Some(cancel.clone()),
            ..JoinOptions::default()
        });

        let mut seen = Vec::new();
        let summary = engine
            .stream(&stations, &facilities, |region| {
                seen.push(region.region.to_string());
                cancel.cancel();
                Ok::<(), ()>(())
            })
            .unwrap();

        assert_eq!(seen, vec!["Jung-gu"]);
        assert_eq!(summary.regions.len(), 1);
        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.cancelled_regions, vec!["Mapo-gu".to_string()]);
    }

    #[test]
    fn test_stream_matches_run() {
        let (stations, facilities) = seoul_sets();
        let engine = ProximityEngine::default();

        let mut streamed = Vec::new();
        let summary = engine
            .stream(&stations, &facilities, |region| {
                streamed.extend(region.pairs);
                Ok::<(), ()>(())
            })
            .unwrap();

        let out = engine.run(&stations, &facilities);
        let collected: Vec<_> = out.all_pairs().copied().collect();
        assert_eq!(streamed, collected);
        assert_eq!(summary, out.summary());
        assert_eq!(summary.nearest_facility_rows, 3);
        assert_eq!(summary.nearest_station_rows, 3);
    }

    #[test]
    fn test_stream_stops_on_sink_error() {
        let (stations, facilities) = seoul_sets();
        let mut calls = 0;
        let result = ProximityEngine::default().stream(&stations, &facilities, |_| {
            calls += 1;
            Err("disk full")
        });
        assert_eq!(result, Err("disk full"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_progress_callback_fires_per_region() {
        use std::sync::atomic::AtomicUsize;

        let (stations, facilities) = seoul_sets();
        let done = AtomicUsize::new(0);
        ProximityEngine::default().run_with_progress(&stations, &facilities, |_| {
            done.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_plan_reuses_partition() {
        let (stations, facilities) = seoul_sets();
        let engine = ProximityEngine::default();

        let plan = engine.plan(&stations, &facilities);
        assert_eq!(plan.region_count(), 2);
        assert_eq!((plan.stations, plan.facilities), (4, 4));

        let planned = engine.run_plan(plan.clone(), |_| {});
        let direct = engine.run(&stations, &facilities);
        assert_eq!(planned.summary(), direct.summary());
        assert_eq!(
            planned.all_pairs().copied().collect::<Vec<_>>(),
            direct.all_pairs().copied().collect::<Vec<_>>()
        );

        let streamed = engine.stream_plan(plan, |_| Ok::<(), ()>(())).unwrap();
        assert_eq!(streamed, direct.summary());
    }

    #[test]
    fn test_nearest_station_within() {
        let (stations, facilities) = seoul_sets();
        let out = ProximityEngine::default().run(&stations, &facilities);

        let close = out.nearest_station_within(100.0);
        let names: Vec<&str> = close.iter().map(|r| r.source().point.name.as_str()).collect();
        assert_eq!(names, vec!["FacA", "FacB", "Gallery"]);
        assert!(out.nearest_station_within(10.0).is_empty());
    }
}
