use std::{collections::HashMap, fmt};

use crate::{Error, Result, ScoreError, constants::MAX_WAYPOINTS};

/// A named point on the plane. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && !self.id.trim().is_empty()
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b1 = ryu::Buffer::new();
        let mut b2 = ryu::Buffer::new();
        write!(f, "{},{},{}", self.id, b1.format(self.x), b2.format(self.y))
    }
}

/// Validated, ordered input for one search. Position 0 is the anchor every route starts at.
#[derive(Clone, Debug)]
pub struct WaypointSet {
    waypoints: Vec<Waypoint>,
    by_id: HashMap<String, usize>,
}

impl WaypointSet {
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self> {
        if waypoints.is_empty() {
            return Err(Error::invalid_input("No waypoints provided."));
        }
        if waypoints.len() > MAX_WAYPOINTS {
            return Err(Error::invalid_input(format!(
                "Too many waypoints for exhaustive search: {} (max {MAX_WAYPOINTS})",
                waypoints.len()
            )));
        }

        let mut by_id = HashMap::with_capacity(waypoints.len());
        for (pos, waypoint) in waypoints.iter().enumerate() {
            if !waypoint.is_valid() {
                return Err(Error::invalid_input(format!(
                    "Waypoint {} has an empty id or non-finite coordinates",
                    pos + 1
                )));
            }
            if by_id.insert(waypoint.id.clone(), pos).is_some() {
                return Err(Error::invalid_input(format!(
                    "Duplicate waypoint id: {}",
                    waypoint.id
                )));
            }
        }

        Ok(Self { waypoints, by_id })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn anchor(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn get(&self, pos: usize) -> Option<&Waypoint> {
        self.waypoints.get(pos)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Looks up every stop; the first unknown position is reported as a scoring failure.
    pub fn resolve(&self, stops: &[usize]) -> std::result::Result<Vec<&Waypoint>, ScoreError> {
        stops
            .iter()
            .map(|&pos| {
                self.get(pos)
                    .ok_or_else(|| ScoreError::missing_waypoint(format!("#{pos}")))
            })
            .collect()
    }
}
