use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use log::LevelFilter;
use tsp_bf_derive::{CliOptions, CliValue, KvDisplay};

use crate::{
    Error, Regime, Result, ScorerKind, TourKind,
    constants::{
        DEFAULT_FAN_OUT_WIDTH, DEFAULT_METRICS_CSV, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SCORER_URL,
        DEFAULT_SEED, DEFAULT_SERVICE_PORT, DEFAULT_WAYPOINTS, MAX_WAYPOINTS, SCORER_URL_ENV,
    },
    dispatch::{DurationSecs, SearchPlan, default_workers},
};

/// Runtime options for a search or service run.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct SearchOptions {
    /// `search` runs the optimizer; `serve` hosts the scoring service.
    #[cli(long = "mode", parse_with = "Mode::parse")]
    pub mode: Mode,
    /// Optional waypoint file. Empty generates `waypoints` random points; `-` reads stdin.
    #[cli(long = "input")]
    pub input: String,
    /// Optional output file for the best route. Empty means stdout.
    #[cli(long = "output")]
    pub output: String,
    /// Number of random waypoints, or the upper bound of a sweep.
    #[cli(long = "waypoints")]
    pub waypoints: usize,
    /// Seed for random waypoint generation.
    #[cli(long = "seed")]
    pub seed: u64,
    #[cli(long = "tour", parse_with = "TourKind::parse")]
    pub tour: TourKind,
    #[cli(long = "regime", parse_with = "Regime::parse")]
    pub regime: Regime,
    /// Worker threads for the bulk regime.
    #[cli(long = "workers")]
    pub workers: usize,
    /// In-flight oracle calls for the fan-out regime.
    #[cli(long = "fan-out-width")]
    pub fan_out_width: usize,
    #[cli(long = "scorer", parse_with = "ScorerKind::parse")]
    pub scorer: ScorerKind,
    /// Endpoint of the remote scoring service.
    #[cli(long = "scorer-url")]
    pub scorer_url: String,
    /// Per-request timeout for the remote scorer.
    #[cli(long = "request-timeout-ms", parse_with = "parse_millis")]
    #[kv(fmt = "secs")]
    pub request_timeout: Duration,
    /// Extra attempts for transient remote failures.
    #[cli(long = "retries")]
    pub retries: u32,
    /// Run deadline in seconds; 0 disables it.
    #[cli(long = "time-limit")]
    #[kv(name = "time_limit_s")]
    pub time_limit: f64,
    /// CSV metrics log. Empty disables it.
    #[cli(long = "metrics-csv")]
    pub metrics_csv: String,
    /// Repeat the search this many times over the same waypoints.
    #[cli(long = "runs")]
    pub runs: usize,
    /// Run once per waypoint count from 2 up to `waypoints`.
    #[cli(long = "sweep", flag)]
    pub sweep: bool,
    /// Run a single-worker bulk baseline before the configured plan and report the speedup.
    #[cli(long = "compare", flag)]
    pub compare: bool,
    /// Listen port for `--mode serve`.
    #[cli(long = "port")]
    pub port: u16,
    /// Structured logging level.
    #[cli(long = "log-level", parse_with = "LogLevel::parse")]
    pub log_level: LogLevel,
    /// Logging output format.
    #[cli(long = "log-format", parse_with = "LogFormat::parse")]
    pub log_format: LogFormat,
    /// Include timestamps in log lines.
    #[cli(long = "log-timestamp", flag)]
    pub log_timestamp: bool,
    /// Optional output file path for logs. Empty means stderr.
    #[cli(long = "log-output")]
    pub log_output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "mode")]
pub enum Mode {
    Search,
    #[cli(alias = "service")]
    Serve,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Search,
            input: String::new(),
            output: String::new(),
            waypoints: DEFAULT_WAYPOINTS,
            seed: DEFAULT_SEED,
            tour: TourKind::Closed,
            regime: Regime::Bulk,
            workers: default_workers(),
            fan_out_width: DEFAULT_FAN_OUT_WIDTH,
            scorer: ScorerKind::Local,
            scorer_url: env::var(SCORER_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_SCORER_URL.to_string()),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            retries: 0,
            time_limit: 0.0,
            metrics_csv: DEFAULT_METRICS_CSV.to_string(),
            runs: 1,
            sweep: false,
            compare: false,
            port: DEFAULT_SERVICE_PORT,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
        }
    }
}

impl SearchOptions {
    pub fn from_args() -> Result<Self> {
        let options = Self::parse_from_iter(env::args().skip(1))?;
        options.validate()?;
        Ok(options)
    }

    fn parse_from_iter<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                return Err(Error::invalid_input(Self::usage()));
            }

            let Some(raw_name) = arg.strip_prefix("--") else {
                return Err(Error::invalid_input(format!(
                    "Unexpected argument: {arg}\n\n{}",
                    Self::usage()
                )));
            };

            if raw_name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Invalid option name: {arg}\n\n{}",
                    Self::usage()
                )));
            }

            let (name, value) = Self::split_arg(raw_name, &mut args);
            if !options.apply_cli_option(&name, value)? {
                return Err(Error::invalid_input(format!(
                    "Unknown option: --{name}\n\n{}",
                    Self::usage()
                )));
            }
        }

        Ok(options)
    }

    /// Cross-field checks that do not belong to any single option.
    pub fn validate(&self) -> Result<()> {
        if self.mode == Mode::Serve {
            return Ok(());
        }
        if self.input_path().is_none() && !self.reads_stdin() {
            if self.waypoints == 0 || self.waypoints > MAX_WAYPOINTS {
                return Err(Error::invalid_input(format!(
                    "--waypoints must be between 1 and {MAX_WAYPOINTS}, got {}",
                    self.waypoints
                )));
            }
        } else if self.sweep {
            return Err(Error::invalid_input(
                "--sweep generates its own waypoints and cannot be combined with --input",
            ));
        }
        if self.runs == 0 {
            return Err(Error::invalid_input("--runs must be > 0"));
        }
        if self.compare && self.sweep {
            return Err(Error::invalid_input(
                "--compare runs on one waypoint set and cannot be combined with --sweep",
            ));
        }
        if !self.time_limit.is_finite() || self.time_limit < 0.0 {
            return Err(Error::invalid_input(format!(
                "--time-limit must be a non-negative number of seconds, got {}",
                self.time_limit
            )));
        }
        if self.regime == Regime::Bulk && self.scorer == ScorerKind::Remote {
            return Err(Error::invalid_input(
                "--scorer remote requires --regime fan-out; the bulk regime scores in-process",
            ));
        }
        self.search_plan().validate()
    }

    pub fn usage() -> &'static str {
        concat!(
            "Usage:\n",
            "  tsp-bf [options] [--input waypoints.txt]\n",
            "  tsp-bf [options] --input - < waypoints.txt\n",
            "  tsp-bf --mode serve [--port 5000]\n\n",
            "Options:\n",
            "  --mode <search|serve>\n",
            "  --input <path|->\n",
            "  --output <path>\n",
            "  --waypoints <usize>            (1..=21, random set when no --input)\n",
            "  --seed <u64>\n",
            "  --tour <open|closed>\n",
            "  --regime <bulk|fan-out>\n",
            "  --workers <usize>\n",
            "  --fan-out-width <usize>\n",
            "  --scorer <local|remote>\n",
            "  --scorer-url <url>             (default: $CALCULATOR_URL)\n",
            "  --request-timeout-ms <u64>\n",
            "  --retries <u32>\n",
            "  --time-limit <seconds>         (0 = none)\n",
            "  --metrics-csv <path>           (empty disables)\n",
            "  --runs <usize>\n",
            "  --sweep[=<bool>]\n",
            "  --no-sweep\n",
            "  --compare[=<bool>]             (single-worker baseline, then the plan)\n",
            "  --no-compare\n",
            "  --port <u16>\n",
            "  --log-level <error|warn|info|debug|trace|off>\n",
            "  --log-format <compact|pretty>\n",
            "  --log-timestamp[=<bool>]\n",
            "  --no-log-timestamp\n",
            "  --log-output <path>\n",
            "  --help\n",
            "\n",
            "Examples:\n",
            "  tsp-bf --waypoints 10 --workers 8 --metrics-csv runs.csv\n",
            "  tsp-bf --input waypoints.txt --tour open --output route.txt\n",
            "  tsp-bf --regime fan-out --scorer remote --fan-out-width 32 --time-limit 60\n",
            "  tsp-bf --sweep --waypoints 11 --runs 3 --log-level=warn\n",
            "  tsp-bf --compare --waypoints 10 --workers 8\n",
            "  tsp-bf --mode serve --port 5000 --log-level=debug\n",
        )
    }

    pub fn search_plan(&self) -> SearchPlan {
        SearchPlan {
            regime: self.regime,
            tour: self.tour,
            workers: self.workers,
            fan_out_width: self.fan_out_width,
            time_limit: (self.time_limit > 0.0)
                .then(|| DurationSecs(Duration::from_secs_f64(self.time_limit))),
        }
    }

    pub fn reads_stdin(&self) -> bool {
        self.input.trim() == "-"
    }

    pub fn input_path(&self) -> Option<&Path> {
        non_stdio_path(&self.input)
    }

    pub fn output_path(&self) -> Option<&Path> {
        non_stdio_path(&self.output)
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        non_stdio_path(&self.log_output)
    }

    pub fn metrics_path(&self) -> Option<PathBuf> {
        let metrics = self.metrics_csv.trim();
        (!metrics.is_empty()).then(|| PathBuf::from(metrics))
    }
}

fn non_stdio_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}

fn parse_millis(raw: &str) -> Result<Duration> {
    raw.parse::<u64>().map(Duration::from_millis).map_err(|e| {
        Error::invalid_input(format!("Invalid millisecond count: {raw} ({e})"))
    })
}
