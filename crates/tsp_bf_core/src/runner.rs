//! Top-level entry points behind the binary: one search, repeated runs, sweeps, a
//! baseline comparison, or the scoring service.

use std::time::Duration;

use tokio::runtime::Runtime;

use crate::{
    Error, LocalOracle, RemoteOracle, Result, ScorerKind, WaypointSet,
    constants::{COMPARE_TOLERANCE, DEFAULT_RETRY_BACKOFF_MS, SWEEP_MIN_WAYPOINTS},
    dispatch::{
        Cancellation, Regime, SearchOutcome, SearchPlan, SearchStatus, cancel_on_interrupt,
        search_bulk, search_fan_out,
    },
    io::{
        input::{random_waypoints, read_waypoints},
        options::{Mode, SearchOptions},
        report::{MetricsLog, RunRecord, write_route},
    },
    service,
};

/// Where routes get scored for the lifetime of one invocation.
enum Engine {
    Bulk,
    FanOut {
        runtime: Runtime,
        remote: Option<RemoteOracle>,
    },
}

impl Engine {
    fn new(options: &SearchOptions) -> Result<Self> {
        match options.regime {
            Regime::Bulk => Ok(Self::Bulk),
            Regime::FanOut => {
                let remote = match options.scorer {
                    ScorerKind::Local => None,
                    ScorerKind::Remote => Some(
                        RemoteOracle::with_timeout(&options.scorer_url, options.request_timeout)?
                            .with_retries(
                                options.retries,
                                Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
                            ),
                    ),
                };
                if let Some(remote) = &remote {
                    log::info!("scorer: remote url={}", remote.url());
                }
                Ok(Self::FanOut {
                    runtime: build_runtime()?,
                    remote,
                })
            }
        }
    }

    fn search(
        &self,
        waypoints: &WaypointSet,
        plan: &SearchPlan,
        cancel: &Cancellation,
    ) -> Result<SearchOutcome> {
        match self {
            Self::Bulk => search_bulk(waypoints, plan, &LocalOracle, cancel),
            Self::FanOut {
                runtime,
                remote: Some(remote),
            } => runtime.block_on(search_fan_out(waypoints, plan, remote, cancel)),
            Self::FanOut {
                runtime,
                remote: None,
            } => runtime.block_on(search_fan_out(waypoints, plan, &LocalOracle, cancel)),
        }
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

pub fn run(options: &SearchOptions) -> Result<()> {
    options.validate()?;
    let cancel = Cancellation::new();
    let _interrupt = cancel_on_interrupt(&cancel);

    match options.mode {
        Mode::Serve => build_runtime()?.block_on(service::serve(options.port, &cancel)),
        Mode::Search if options.sweep => run_sweep(options, &cancel),
        Mode::Search if options.compare => run_compare(options, &cancel),
        Mode::Search => run_search(options, &cancel),
    }
}

fn run_search(options: &SearchOptions, cancel: &Cancellation) -> Result<()> {
    let waypoints = load_waypoints(options)?;
    let plan = options.search_plan();
    let engine = Engine::new(options)?;
    let metrics = options.metrics_path().map(MetricsLog::new);

    log::info!("plan: {plan}");

    let mut last = None;
    for run in 1..=options.runs {
        log::info!("run: {run}/{} n={}", options.runs, waypoints.len());
        last = Some(run_once(&engine, &waypoints, &plan, cancel, metrics.as_ref())?);
    }

    match last.and_then(|outcome| outcome.best) {
        Some(best) => {
            log::info!("best: {} distance={:.4}", best.route.describe(&waypoints), best.distance);
            write_route(&waypoints, &best.route, options.output_path())
        }
        None => {
            log::error!("best: no valid route found");
            Ok(())
        }
    }
}

/// One batch of runs per waypoint count from 2 to `--waypoints`, each on a fresh seeded set.
fn run_sweep(options: &SearchOptions, cancel: &Cancellation) -> Result<()> {
    let plan = options.search_plan();
    let engine = Engine::new(options)?;
    let metrics = options.metrics_path().map(MetricsLog::new);

    if options.waypoints < SWEEP_MIN_WAYPOINTS {
        log::warn!(
            "sweep: nothing to do, --waypoints {} is below {SWEEP_MIN_WAYPOINTS}",
            options.waypoints
        );
        return Ok(());
    }

    for n in SWEEP_MIN_WAYPOINTS..=options.waypoints {
        let waypoints = random_waypoints(n, options.seed)?;
        for run in 1..=options.runs {
            log::info!("sweep: n={n} run={run}/{}", options.runs);
            run_once(&engine, &waypoints, &plan, cancel, metrics.as_ref())?;
        }
    }
    Ok(())
}

/// Single-worker bulk baseline, then the configured plan, on the same waypoints.
fn run_compare(options: &SearchOptions, cancel: &Cancellation) -> Result<()> {
    let waypoints = load_waypoints(options)?;
    let plan = options.search_plan();
    let baseline_plan = SearchPlan {
        regime: Regime::Bulk,
        workers: 1,
        ..plan.clone()
    };
    let engine = Engine::new(options)?;
    let metrics = options.metrics_path().map(MetricsLog::new);

    log::info!("compare: baseline {baseline_plan}");
    let baseline = run_once(&Engine::Bulk, &waypoints, &baseline_plan, cancel, metrics.as_ref())?;
    log::info!("compare: parallel {plan}");
    let parallel = run_once(&engine, &waypoints, &plan, cancel, metrics.as_ref())?;

    compare_outcomes(&baseline, &parallel)?;
    match parallel.best {
        Some(best) => write_route(&waypoints, &best.route, options.output_path()),
        None => {
            log::error!("best: no valid route found");
            Ok(())
        }
    }
}

/// Speedup of `parallel` over `baseline`; both must agree on the best distance.
fn compare_outcomes(baseline: &SearchOutcome, parallel: &SearchOutcome) -> Result<f64> {
    let agree = match (baseline.best_distance(), parallel.best_distance()) {
        (Some(a), Some(b)) => (a - b).abs() <= COMPARE_TOLERANCE * a.abs().max(b.abs()).max(1.0),
        (None, None) => true,
        _ => false,
    };
    if !agree {
        return Err(Error::invalid_data(format!(
            "compare: best distances differ, baseline={:?} parallel={:?}",
            baseline.best_distance(),
            parallel.best_distance()
        )));
    }

    let parallel_secs = parallel.elapsed.as_secs_f64();
    let speedup = if parallel_secs > 0.0 {
        baseline.elapsed.as_secs_f64() / parallel_secs
    } else {
        f64::INFINITY
    };
    log::info!(
        "compare: baseline={:.4}s parallel={:.4}s regime={} concurrency={} speedup={speedup:.2}x",
        baseline.elapsed.as_secs_f64(),
        parallel_secs,
        parallel.regime,
        parallel.concurrency,
    );
    Ok(speedup)
}

fn run_once(
    engine: &Engine,
    waypoints: &WaypointSet,
    plan: &SearchPlan,
    cancel: &Cancellation,
    metrics: Option<&MetricsLog>,
) -> Result<SearchOutcome> {
    let outcome = engine.search(waypoints, plan, cancel)?;

    if outcome.status == SearchStatus::Cancelled {
        return Err(Error::other(format!(
            "search cancelled after {}/{} routes; no run record written",
            outcome.routes_attempted, outcome.routes_total
        )));
    }

    if let Some(metrics) = metrics
        && let Some(record) = RunRecord::from_outcome(&outcome)
    {
        metrics.append(&record)?;
    }
    Ok(outcome)
}

fn load_waypoints(options: &SearchOptions) -> Result<WaypointSet> {
    let waypoints = if let Some(path) = options.input_path() {
        read_waypoints(Some(path))?
    } else if options.reads_stdin() {
        read_waypoints(None)?
    } else {
        random_waypoints(options.waypoints, options.seed)?
    };
    log::info!(
        "input: n={} anchor={}",
        waypoints.len(),
        waypoints.anchor().id
    );
    Ok(waypoints)
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::{compare_outcomes, run};
    use crate::{
        Regime, Route, TourKind,
        dispatch::{ScoredRoute, SearchOutcome, SearchStatus},
        io::{options::SearchOptions, test_support::unique_temp_dir},
    };

    fn finished(distance: f64, elapsed_ms: u64, regime: Regime) -> SearchOutcome {
        SearchOutcome {
            status: SearchStatus::Completed,
            best: Some(ScoredRoute::new(0, Route::new(vec![0, 1, 0]), distance)),
            waypoint_count: 2,
            routes_total: 1,
            routes_attempted: 1,
            failures: 0,
            elapsed: Duration::from_millis(elapsed_ms),
            regime,
            concurrency: 4,
        }
    }

    fn options_in(dir: &std::path::Path) -> SearchOptions {
        SearchOptions {
            output: dir.join("route.txt").display().to_string(),
            metrics_csv: dir.join("metrics.csv").display().to_string(),
            workers: 2,
            ..SearchOptions::default()
        }
    }

    #[test]
    fn search_writes_route_and_one_record_per_run() {
        let dir = unique_temp_dir("runner-search");
        let input = dir.join("points.txt");
        fs::write(&input, "A,0,0 B,3,4 C,6,8").expect("write input");
        let options = SearchOptions {
            input: input.display().to_string(),
            runs: 2,
            ..options_in(&dir)
        };

        run(&options).expect("run");

        let route = fs::read_to_string(dir.join("route.txt")).expect("route output");
        assert_eq!(route, "A,0.0,0.0\nB,3.0,4.0\nC,6.0,8.0\nA,0.0,0.0\n");
        let metrics = fs::read_to_string(dir.join("metrics.csv")).expect("metrics");
        assert_eq!(metrics.lines().count(), 3);
        assert!(metrics.lines().nth(1).expect("row").starts_with("3,2,0,20.0,"));

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn fan_out_with_local_scorer_matches_bulk_route() {
        let dir = unique_temp_dir("runner-fan-out");
        let bulk_dir = dir.join("bulk");
        let fan_dir = dir.join("fan");
        fs::create_dir_all(&bulk_dir).expect("bulk dir");
        fs::create_dir_all(&fan_dir).expect("fan dir");

        run(&SearchOptions {
            waypoints: 6,
            tour: TourKind::Open,
            ..options_in(&bulk_dir)
        })
        .expect("bulk run");
        run(&SearchOptions {
            waypoints: 6,
            tour: TourKind::Open,
            regime: Regime::FanOut,
            fan_out_width: 8,
            ..options_in(&fan_dir)
        })
        .expect("fan-out run");

        let bulk = fs::read_to_string(bulk_dir.join("route.txt")).expect("bulk route");
        let fan = fs::read_to_string(fan_dir.join("route.txt")).expect("fan route");
        assert_eq!(bulk, fan);
        assert_eq!(bulk.lines().count(), 6);

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn sweep_records_every_waypoint_count() {
        let dir = unique_temp_dir("runner-sweep");
        let options = SearchOptions {
            sweep: true,
            waypoints: 5,
            ..options_in(&dir)
        };

        run(&options).expect("sweep");

        let metrics = fs::read_to_string(dir.join("metrics.csv")).expect("metrics");
        let counts: Vec<&str> = metrics
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().expect("num_cities"))
            .collect();
        assert_eq!(counts, ["2", "3", "4", "5"]);
        assert!(!dir.join("route.txt").exists());

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn compare_records_baseline_then_configured_plan() {
        let dir = unique_temp_dir("runner-compare");
        let options = SearchOptions {
            compare: true,
            waypoints: 7,
            workers: 3,
            regime: Regime::FanOut,
            fan_out_width: 16,
            ..options_in(&dir)
        };

        run(&options).expect("compare");

        let metrics = fs::read_to_string(dir.join("metrics.csv")).expect("metrics");
        let rows: Vec<Vec<&str>> = metrics
            .lines()
            .skip(1)
            .map(|line| line.split(',').collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][5], "bulk");
        assert_eq!(rows[0][6], "1");
        assert_eq!(rows[1][5], "fan-out");
        assert_eq!(rows[1][6], "16");
        assert_eq!(rows[0][3], rows[1][3]);
        assert_eq!(rows[0][1], "720");
        assert!(dir.join("route.txt").exists());

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn compare_outcomes_reports_speedup_and_rejects_mismatch() {
        let baseline = finished(20.0, 400, Regime::Bulk);
        let parallel = finished(20.0, 100, Regime::FanOut);
        let speedup = compare_outcomes(&baseline, &parallel).expect("agreeing outcomes");
        assert!((speedup - 4.0).abs() < 1e-9);

        let wrong = finished(21.0, 100, Regime::FanOut);
        let err = compare_outcomes(&baseline, &wrong).expect_err("mismatch");
        assert!(err.to_string().contains("best distances differ"));
    }

    #[test]
    fn elapsed_time_limit_fails_without_record() {
        let dir = unique_temp_dir("runner-cancel");
        let options = SearchOptions {
            waypoints: 9,
            time_limit: 1e-9,
            ..options_in(&dir)
        };

        let err = run(&options).expect_err("cancelled run");
        assert!(err.to_string().contains("search cancelled"));
        assert!(!dir.join("metrics.csv").exists());

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn invalid_options_fail_before_searching() {
        let dir = unique_temp_dir("runner-invalid");
        let options = SearchOptions {
            waypoints: 30,
            ..options_in(&dir)
        };
        assert!(run(&options).is_err());
        fs::remove_dir_all(dir).expect("cleanup");
    }
}
