mod permutation;

use std::fmt::Write;

use tsp_bf_derive::CliValue;

use crate::WaypointSet;

pub use permutation::{RouteGenerator, RouteScan};

/// Whether a route returns to the anchor after the last waypoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "tour")]
pub enum TourKind {
    Open,
    #[cli(alias = "cycle")]
    Closed,
}

/// One full ordering of waypoint positions, starting at the anchor.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Route {
    stops: Vec<usize>,
}

impl Route {
    pub fn new(stops: Vec<usize>) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// `A -> B -> C` using waypoint ids; unknown positions render as `#pos`.
    pub fn describe(&self, waypoints: &WaypointSet) -> String {
        let mut out = String::new();
        for (i, &pos) in self.stops.iter().enumerate() {
            if i > 0 {
                out.push_str(" -> ");
            }
            match waypoints.get(pos) {
                Some(waypoint) => out.push_str(&waypoint.id),
                None => {
                    let _ = write!(out, "#{pos}");
                }
            }
        }
        out
    }
}
