//! Exhaustive route search over small waypoint sets with a pluggable distance oracle.
//! Every permutation is scored, either in-process on a rayon pool or through a bounded
//! fan-out of concurrent (typically remote) oracle calls.

mod constants;
pub mod dispatch;
mod error;
mod geo;
mod io;
pub mod logging;
pub mod oracle;
mod route;
pub mod runner;
pub mod service;

pub(crate) use geo::geometry;
pub(crate) use io::options;

pub use dispatch::{
    BestSoFar, Cancellation, Regime, ScoredRoute, SearchOutcome, SearchPlan, SearchStatus,
    search_bulk, search_fan_out,
};
pub use error::{Error, Result, ScoreError};
pub use geo::waypoint::{Waypoint, WaypointSet};
pub use io::input::{parse_waypoints, random_waypoints, read_waypoints};
pub use io::options::{LogFormat, LogLevel, Mode, SearchOptions};
pub use io::report::{MetricsLog, RunRecord, write_route};
pub use oracle::{BlockingOracle, DistanceOracle, LocalOracle, RemoteOracle, ScorerKind};
pub use route::{Route, RouteGenerator, RouteScan, TourKind};
