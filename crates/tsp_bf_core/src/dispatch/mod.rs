//! Drives every route through an oracle and reduces the results to one best route.
//!
//! Two regimes share the same reduction rules:
//! - bulk partition: contiguous index chunks scanned on a rayon pool, one chunk per worker,
//!   for CPU-bound in-process scoring;
//! - fan-out: a bounded number of in-flight oracle calls multiplexed on one reducer task,
//!   for latency-bound remote scoring.

mod best;
mod bulk;
mod cancel;
mod fan_out;

use std::{thread, time::Duration};

use tsp_bf_derive::{CliValue, KvDisplay};

use crate::{
    Error, Result, TourKind,
    constants::{DEFAULT_FAN_OUT_WIDTH, THREAD_FALLBACK_PARALLELISM},
};

pub use best::{BestSoFar, Offer, ScoredRoute};
pub use bulk::search_bulk;
pub use cancel::{Cancellation, InterruptGuard, cancel_on_interrupt};
pub use fan_out::search_fan_out;

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "regime")]
pub enum Regime {
    #[cli(alias = "bulk-partition")]
    Bulk,
    #[cli(alias = "fanout")]
    FanOut,
}

/// How one search run is scheduled.
#[derive(Clone, Debug, KvDisplay)]
pub struct SearchPlan {
    pub regime: Regime,
    pub tour: TourKind,
    /// Rayon workers for the bulk regime.
    pub workers: usize,
    /// Maximum in-flight oracle calls for the fan-out regime.
    pub fan_out_width: usize,
    #[kv(fmt = "opt", name = "time_limit_s")]
    pub time_limit: Option<DurationSecs>,
}

impl Default for SearchPlan {
    fn default() -> Self {
        Self {
            regime: Regime::Bulk,
            tour: TourKind::Closed,
            workers: default_workers(),
            fan_out_width: DEFAULT_FAN_OUT_WIDTH,
            time_limit: None,
        }
    }
}

impl SearchPlan {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_input("workers must be > 0"));
        }
        if self.fan_out_width == 0 {
            return Err(Error::invalid_input("fan_out_width must be > 0"));
        }
        Ok(())
    }

    /// Worker count this plan actually uses, for logs and run records.
    pub fn concurrency(&self) -> usize {
        match self.regime {
            Regime::Bulk => self.workers,
            Regime::FanOut => self.fan_out_width,
        }
    }

    pub(crate) fn time_limit(&self) -> Option<Duration> {
        self.time_limit.map(|limit| limit.0)
    }
}

/// A duration rendered as fractional seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationSecs(pub Duration);

impl std::fmt::Display for DurationSecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0.as_secs_f64())
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(THREAD_FALLBACK_PARALLELISM)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchStatus {
    Completed,
    /// Every route failed to score.
    NoValidRoute,
    /// The latch tripped (Ctrl-C or time limit) before every route was processed.
    Cancelled,
}

/// Frozen result of one search run.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub best: Option<ScoredRoute>,
    pub waypoint_count: usize,
    pub routes_total: u64,
    /// Routes that finished scoring, successfully or not.
    pub routes_attempted: u64,
    pub failures: u64,
    pub elapsed: Duration,
    pub regime: Regime,
    pub concurrency: usize,
}

impl SearchOutcome {
    pub fn best_distance(&self) -> Option<f64> {
        self.best.as_ref().map(|best| best.distance)
    }

    pub fn is_complete(&self) -> bool {
        self.status != SearchStatus::Cancelled
    }

    pub(crate) fn log_summary(&self) {
        match (&self.status, &self.best) {
            (SearchStatus::Completed, Some(best)) => log::info!(
                "search: complete n={} routes={} failures={} best={:.4} best_index={} time={:.4}s",
                self.waypoint_count,
                self.routes_attempted,
                self.failures,
                best.distance,
                best.index,
                self.elapsed.as_secs_f64()
            ),
            (SearchStatus::Cancelled, _) => log::warn!(
                "search: cancelled n={} routes={}/{} failures={} time={:.4}s",
                self.waypoint_count,
                self.routes_attempted,
                self.routes_total,
                self.failures,
                self.elapsed.as_secs_f64()
            ),
            _ => log::error!(
                "search: no valid route found n={} routes={} failures={} time={:.4}s",
                self.waypoint_count,
                self.routes_attempted,
                self.failures,
                self.elapsed.as_secs_f64()
            ),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub(crate) scored: u64,
    pub(crate) failed: u64,
}

impl Tally {
    pub(crate) fn attempted(&self) -> u64 {
        self.scored + self.failed
    }

    pub(crate) fn absorb(&mut self, other: &Tally) {
        self.scored += other.scored;
        self.failed += other.failed;
    }
}

/// Freezes the cell and classifies the run. Any observed cancellation means the run
/// cannot claim to be complete.
pub(crate) fn settle(
    best: &BestSoFar,
    cancel: &Cancellation,
    tally: &Tally,
) -> (SearchStatus, Option<ScoredRoute>) {
    let final_best = best.freeze();
    let status = if cancel.is_cancelled() {
        SearchStatus::Cancelled
    } else if final_best.is_none() {
        SearchStatus::NoValidRoute
    } else {
        SearchStatus::Completed
    };
    log::debug!(
        "search: settled status={status:?} scored={} failed={}",
        tally.scored,
        tally.failed
    );
    (status, final_best)
}
