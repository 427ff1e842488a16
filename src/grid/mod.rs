//! Positional primitives for the combat grid

pub mod coord;
pub mod grid;

pub use coord::GridCoord;
pub use grid::SpatialGrid;
