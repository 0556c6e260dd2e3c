use std::{fs, io::Read, path::Path};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Error, Result, Waypoint, WaypointSet, constants::COORDINATE_RANGE};

/// Reads waypoints from `path`, or from stdin when no path is given.
pub fn read_waypoints(path: Option<&Path>) -> Result<WaypointSet> {
    let input = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!("failed to read input {}: {e}", path.display()))
        })?,
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        }
    };
    parse_waypoints(&input)
}

/// Parses whitespace-separated `x,y` or `id,x,y` tokens. Tokens without an id are named
/// after their position (`C1`, `C2`, ...).
pub fn parse_waypoints(input: &str) -> Result<WaypointSet> {
    let mut waypoints = Vec::new();
    for (idx, tok) in input.split_whitespace().enumerate() {
        let fields: Vec<&str> = tok.split(',').collect();
        let (id, x_s, y_s) = match fields.as_slice() {
            [x, y] => (format!("C{}", idx + 1), *x, *y),
            [id, x, y] => ((*id).to_string(), *x, *y),
            _ => {
                return Err(Error::invalid_input(format!(
                    "Token {}: expected 'x,y' or 'id,x,y' but got: {tok}",
                    idx + 1
                )));
            }
        };

        let x: f64 = x_s.parse().map_err(|_| {
            Error::invalid_input(format!("Token {}: invalid x coordinate: {x_s}", idx + 1))
        })?;
        let y: f64 = y_s.parse().map_err(|_| {
            Error::invalid_input(format!("Token {}: invalid y coordinate: {y_s}", idx + 1))
        })?;

        waypoints.push(Waypoint::new(id, x, y));
    }

    WaypointSet::new(waypoints)
}

/// `n` waypoints drawn uniformly from the square `[0, 100)²`; the same seed always yields the
/// same set.
pub fn random_waypoints(n: usize, seed: u64) -> Result<WaypointSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    let waypoints = (1..=n)
        .map(|i| {
            let x = rng.gen_range(0.0..COORDINATE_RANGE);
            let y = rng.gen_range(0.0..COORDINATE_RANGE);
            Waypoint::new(format!("C{i}"), x, y)
        })
        .collect();
    WaypointSet::new(waypoints)
}
