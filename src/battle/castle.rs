//! Castles: fortifications a defending formation can hold

use serde::{Deserialize, Serialize};

use crate::grid::GridCoord;

/// A fortification anchored to one grid coordinate.
///
/// Defenders inside have their defense rolls scaled by the castle level;
/// attackers must physically reach the defended coordinate to storm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Castle {
    pub level: u32,
    pub position: GridCoord,
}

impl Castle {
    pub fn new(level: u32, position: GridCoord) -> Self {
        Self { level, position }
    }
}
