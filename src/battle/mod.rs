//! Battle resolution: units, formations and the round loop
//!
//! Two merged formations fight over a shared grid through successive rounds
//! of ranged fire, movement and melee until one side has nothing active
//! left or the round cap forces a stalemate.

pub mod castle;
pub mod commander;
pub mod engine;
pub mod formation;
pub mod report;
pub mod roster;
pub mod unit;

// Re-exports for convenient access
pub use castle::Castle;
pub use commander::Commander;
pub use engine::Battle;
pub use formation::Formation;
pub use report::{BattleReport, UnitTally};
pub use roster::{ArmyRoster, BattleSink, CastleRecord, MemorySink, UnitOutcome, UnitRecord};
pub use unit::CombatUnit;
