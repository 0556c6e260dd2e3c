use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    Error, Result, Route, WaypointSet,
    dispatch::{SearchOutcome, SearchStatus},
};

/// One row of the metrics log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunRecord {
    pub num_cities: usize,
    pub paths_processed: u64,
    pub failures: u64,
    /// Empty cell when no route could be scored.
    pub best_distance: Option<f64>,
    pub duration_s: f64,
    pub regime: String,
    pub workers: usize,
}

impl RunRecord {
    /// Cancelled runs have no record.
    pub fn from_outcome(outcome: &SearchOutcome) -> Option<Self> {
        if outcome.status == SearchStatus::Cancelled {
            return None;
        }
        Some(Self {
            num_cities: outcome.waypoint_count,
            paths_processed: outcome.routes_attempted,
            failures: outcome.failures,
            best_distance: outcome.best_distance(),
            duration_s: round4(outcome.elapsed.as_secs_f64()),
            regime: outcome.regime.to_string(),
            workers: outcome.concurrency,
        })
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Append-only CSV metrics log.
#[derive(Clone, Debug)]
pub struct MetricsLog {
    path: PathBuf,
}

impl MetricsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record`, writing the header first when the file is new or empty. The row is
    /// rendered in memory and lands with a single write.
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::other(format!(
                    "failed to open metrics log {}: {e}",
                    self.path.display()
                ))
            })?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(Vec::new());
        writer.serialize(record)?;
        let row = writer
            .into_inner()
            .map_err(|e| Error::other(format!("failed to render metrics row: {e}")))?;

        file.write_all(&row)?;
        log::debug!(
            "report: appended path={} header={needs_header} n={}",
            self.path.display(),
            record.num_cities
        );
        Ok(())
    }
}

/// Writes the route as one `id,x,y` line per stop, to `path` or stdout.
pub fn write_route(waypoints: &WaypointSet, route: &Route, path: Option<&Path>) -> Result<()> {
    let stops = waypoints
        .resolve(route.stops())
        .map_err(|e| Error::invalid_data(format!("best route does not match waypoints: {e}")))?;

    match path {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::new(fs::File::create(path)?);
            for stop in stops {
                writeln!(out, "{stop}")?;
            }
            out.flush()?;
        }
        None => {
            let mut out = io::stdout().lock();
            for stop in stops {
                writeln!(out, "{stop}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::{MetricsLog, RunRecord, write_route};
    use crate::{
        BlockingOracle, LocalOracle, Route, ScoreError, TourKind, Waypoint, WaypointSet,
        dispatch::{Cancellation, Regime, ScoredRoute, SearchOutcome, SearchPlan, SearchStatus},
        io::test_support::unique_temp_dir,
        oracle::ScoreResult,
        search_bulk,
    };

    /// Fails every route that visits position 1 right after the anchor.
    struct RejectsSecondStop;

    impl BlockingOracle for RejectsSecondStop {
        fn measure(&self, waypoints: &WaypointSet, stops: &[usize]) -> ScoreResult {
            if stops.get(1) == Some(&1) {
                return Err(ScoreError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            LocalOracle.measure(waypoints, stops)
        }
    }

    fn outcome(status: SearchStatus, best: Option<f64>) -> SearchOutcome {
        SearchOutcome {
            status,
            best: best
                .map(|distance| ScoredRoute::new(0, Route::new(vec![0, 1, 2, 0]), distance)),
            waypoint_count: 3,
            routes_total: 2,
            routes_attempted: 2,
            failures: 0,
            elapsed: Duration::from_micros(1_234_567),
            regime: Regime::FanOut,
            concurrency: 64,
        }
    }

    #[test]
    fn record_rounds_duration_and_keeps_regime() {
        let record =
            RunRecord::from_outcome(&outcome(SearchStatus::Completed, Some(20.0))).expect("record");
        assert_eq!(record.duration_s, 1.2346);
        assert_eq!(record.best_distance, Some(20.0));
        assert_eq!(record.regime, "fan-out");
        assert_eq!(record.workers, 64);
    }

    #[test]
    fn cancelled_run_has_no_record() {
        assert!(RunRecord::from_outcome(&outcome(SearchStatus::Cancelled, Some(1.0))).is_none());
    }

    #[test]
    fn append_writes_header_once_and_empty_best_cell() {
        let dir = unique_temp_dir("metrics-append");
        let log = MetricsLog::new(dir.join("nested/metrics.csv"));

        let completed =
            RunRecord::from_outcome(&outcome(SearchStatus::Completed, Some(20.0))).expect("record");
        let failed =
            RunRecord::from_outcome(&outcome(SearchStatus::NoValidRoute, None)).expect("record");
        log.append(&completed).expect("first append");
        log.append(&failed).expect("second append");

        let written = fs::read_to_string(log.path()).expect("read metrics");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            [
                "num_cities,paths_processed,failures,best_distance,duration_s,regime,workers",
                "3,2,0,20.0,1.2346,fan-out,64",
                "3,2,0,,1.2346,fan-out,64",
            ]
        );

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn failed_routes_reach_the_metrics_row() {
        let dir = unique_temp_dir("metrics-failures");
        let set = WaypointSet::new(
            (0..5)
                .map(|i| Waypoint::new(format!("C{i}"), i as f64, (i * i) as f64))
                .collect(),
        )
        .expect("valid set");
        let plan = SearchPlan {
            regime: Regime::Bulk,
            tour: TourKind::Closed,
            workers: 2,
            ..SearchPlan::default()
        };

        let outcome =
            search_bulk(&set, &plan, &RejectsSecondStop, &Cancellation::new()).expect("search");
        assert_eq!(outcome.status, SearchStatus::Completed);
        let record = RunRecord::from_outcome(&outcome).expect("record");
        let log = MetricsLog::new(dir.join("metrics.csv"));
        log.append(&record).expect("append");

        let written = fs::read_to_string(log.path()).expect("read metrics");
        let row: Vec<&str> = written
            .lines()
            .nth(1)
            .expect("data row")
            .split(',')
            .collect();
        assert_eq!(row[0], "5");
        assert_eq!(row[1], "24");
        assert_eq!(row[2], "6");
        assert!(!row[3].is_empty());
        assert_eq!(row[5], "bulk");

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn append_adds_header_to_existing_empty_file() {
        let dir = unique_temp_dir("metrics-empty");
        let path = dir.join("metrics.csv");
        fs::write(&path, "").expect("create empty file");

        let record =
            RunRecord::from_outcome(&outcome(SearchStatus::Completed, Some(5.5))).expect("record");
        MetricsLog::new(&path).append(&record).expect("append");

        let written = fs::read_to_string(&path).expect("read metrics");
        assert!(written.starts_with("num_cities,"));
        assert_eq!(written.lines().count(), 2);

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn write_route_prints_one_line_per_stop() {
        let dir = unique_temp_dir("route-output");
        let path = dir.join("out/route.txt");
        let set = WaypointSet::new(vec![
            Waypoint::new("A", 0.0, 0.0),
            Waypoint::new("B", 3.0, 4.0),
        ])
        .expect("valid set");

        write_route(&set, &Route::new(vec![0, 1, 0]), Some(&path)).expect("write route");
        let written = fs::read_to_string(&path).expect("read route");
        assert_eq!(written, "A,0.0,0.0\nB,3.0,4.0\nA,0.0,0.0\n");

        let err = write_route(&set, &Route::new(vec![0, 5]), Some(&path)).expect_err("bad route");
        assert!(err.to_string().contains("does not match waypoints"));

        fs::remove_dir_all(dir).expect("cleanup");
    }
}
