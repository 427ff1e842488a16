//! Sparse spatial grid mapping coordinates to the units occupying them

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::UnitId;
use crate::grid::coord::GridCoord;

/// Maps grid coordinates to the units standing there.
///
/// Buckets are created lazily; looking up an empty cell is not an error.
/// The grid holds unit ids only; unit data lives in the battle's arena.
/// Destroyed units stay on the grid; it is discarded with the battle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialGrid {
    buckets: AHashMap<GridCoord, Vec<UnitId>>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit at a coordinate
    pub fn add(&mut self, id: UnitId, pos: GridCoord) {
        self.buckets.entry(pos).or_default().push(id);
    }

    /// Move a unit from one coordinate to another
    pub fn relocate(&mut self, id: UnitId, from: GridCoord, to: GridCoord) {
        if let Some(bucket) = self.buckets.get_mut(&from) {
            if let Some(slot) = bucket.iter().position(|u| *u == id) {
                bucket.swap_remove(slot);
            }
        }
        self.add(id, to);
    }

    /// Units at a coordinate; empty for unoccupied cells
    pub fn units_at(&self, pos: GridCoord) -> &[UnitId] {
        self.buckets.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_lookup() {
        let grid = SpatialGrid::new();
        assert!(grid.units_at(GridCoord::new(4, 4, 0)).is_empty());
    }

    #[test]
    fn test_add_and_lookup() {
        let mut grid = SpatialGrid::new();
        let pos = GridCoord::new(0, 1, 0);
        grid.add(UnitId(0), pos);
        grid.add(UnitId(1), pos);
        assert_eq!(grid.units_at(pos), &[UnitId(0), UnitId(1)]);
    }

    #[test]
    fn test_relocate_moves_between_buckets() {
        let mut grid = SpatialGrid::new();
        let from = GridCoord::new(0, 0, 0);
        let to = GridCoord::new(0, 3, 0);
        grid.add(UnitId(2), from);
        grid.relocate(UnitId(2), from, to);
        assert!(grid.units_at(from).is_empty());
        assert_eq!(grid.units_at(to), &[UnitId(2)]);
    }

    #[test]
    fn test_relocate_from_unknown_cell_still_lands() {
        let mut grid = SpatialGrid::new();
        let to = GridCoord::new(1, 1, 0);
        grid.relocate(UnitId(3), GridCoord::new(9, 9, 9), to);
        assert_eq!(grid.units_at(to), &[UnitId(3)]);
    }
}
