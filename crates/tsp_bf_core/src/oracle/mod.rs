//! Route scoring. Every realization computes the same open-path length over the route's
//! stops; they differ only in where the arithmetic runs and how it can fail.

mod local;
mod remote;
pub(crate) mod wire;

use tsp_bf_derive::CliValue;

use crate::{Route, ScoreError, WaypointSet};

pub use local::LocalOracle;
pub use remote::RemoteOracle;

pub type ScoreResult = std::result::Result<f64, ScoreError>;

/// Scores one route. Implementations never return NaN or a negative length for a
/// successful score; anything unusable is a [`ScoreError`].
#[allow(async_fn_in_trait)]
pub trait DistanceOracle {
    fn name(&self) -> &'static str;

    async fn score(&self, waypoints: &WaypointSet, route: &Route) -> ScoreResult;
}

/// Scorers cheap enough to call inline from a CPU-bound worker thread.
pub trait BlockingOracle: Sync {
    fn measure(&self, waypoints: &WaypointSet, stops: &[usize]) -> ScoreResult;
}

/// Which oracle a search run talks to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "scorer")]
pub enum ScorerKind {
    Local,
    #[cli(alias = "http")]
    Remote,
}
