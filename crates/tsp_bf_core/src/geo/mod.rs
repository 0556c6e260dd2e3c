pub(crate) mod geometry;
pub mod waypoint;
