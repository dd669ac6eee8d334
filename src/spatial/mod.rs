//! Nearest-place spatial index.
//!
//! A balanced k-d tree over gazetteer points, searched with the haversine
//! great-circle metric.

pub mod distance;
mod kdtree;

pub use distance::{haversine_km, EARTH_RADIUS_KM};
pub use kdtree::{KdTree, Neighbor};
