/// (N-1)! must fit in `u64`; 20! is the largest factorial that does.
pub(crate) const MAX_WAYPOINTS: usize = 21;

pub(crate) const DEFAULT_WAYPOINTS: usize = 8;
pub(crate) const DEFAULT_SEED: u64 = 12_345;
pub(crate) const DEFAULT_FAN_OUT_WIDTH: usize = 64;
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;
pub(crate) const DEFAULT_SERVICE_PORT: u16 = 5_000;
pub(crate) const DEFAULT_METRICS_CSV: &str = "metrics.csv";
pub(crate) const DEFAULT_SCORER_URL: &str = "http://localhost:5000/calculate_distance";
pub(crate) const SCORER_URL_ENV: &str = "CALCULATOR_URL";

/// Side length of the square random waypoints are drawn from.
pub(crate) const COORDINATE_RANGE: f64 = 100.0;

pub(crate) const THREAD_FALLBACK_PARALLELISM: usize = 2;

/// Sweeps start at the smallest set that has a segment to measure.
pub(crate) const SWEEP_MIN_WAYPOINTS: usize = 2;

/// Relative tolerance when a comparison run checks both best distances agree.
pub(crate) const COMPARE_TOLERANCE: f64 = 1e-9;
