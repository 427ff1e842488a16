//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a unit in the battle's unit arena.
///
/// Formations and the spatial grid refer to units by id; only the battle
/// itself owns the unit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which side of the battle a formation fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Attacker => write!(f, "Attacker"),
            Side::Defender => write!(f, "Defender"),
        }
    }
}

/// Final result of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Combat is still running (or was never run)
    #[default]
    Undecided,
    AttackerWin,
    DefenderWin,
    /// Mutual destruction or a stalemate at the round cap
    Draw,
}
