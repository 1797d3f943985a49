// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod ray;

pub use aabb::{Aabb, Axis};
pub use ray::Ray;
