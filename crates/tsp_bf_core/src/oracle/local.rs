use super::{BlockingOracle, DistanceOracle, ScoreResult};
use crate::{Route, ScoreError, Waypoint, WaypointSet, geometry::PathGeometry};

/// In-process scorer used by the baseline and the bulk-partition regime.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalOracle;

impl BlockingOracle for LocalOracle {
    fn measure(&self, waypoints: &WaypointSet, stops: &[usize]) -> ScoreResult {
        if let Some(&missing) = stops.iter().find(|&&pos| pos >= waypoints.len()) {
            return Err(ScoreError::missing_waypoint(format!("#{missing}")));
        }
        PathGeometry::finite_path_length(
            stops
                .iter()
                .filter_map(|&pos| waypoints.get(pos))
                .map(Waypoint::coords),
        )
        .ok_or(ScoreError::NonFiniteLength)
    }
}

impl DistanceOracle for LocalOracle {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn score(&self, waypoints: &WaypointSet, route: &Route) -> ScoreResult {
        self.measure(waypoints, route.stops())
    }
}
