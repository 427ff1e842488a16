//! Boundary types: army rosters in, unit outcomes out
//!
//! The engine owns no persistence. Callers hand in plain roster data,
//! and after combat the final unit state flows back out through a
//! caller-supplied sink, which also receives the battle reports.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

use crate::battle::commander::Commander;
use crate::battle::report::BattleReport;
use crate::catalog::UnitKind;
use crate::core::error::Result;

/// One persisted unit row, as the host stores it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    /// The host's persistent id, echoed back in the outcome
    pub id: Uuid,
    pub type_id: u8,
    pub quantity: u32,
    pub level: u32,
    pub equipment: u32,
    pub xp: i32,
    pub commander: Option<Commander>,
}

impl UnitRecord {
    pub fn new(type_id: u8, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            type_id,
            quantity,
            level: 0,
            equipment: 0,
            xp: 0,
            commander: None,
        }
    }
}

/// A fortification the defenders hold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastleRecord {
    pub level: u32,
    /// Raw persisted coordinate. Anything but three components falls back
    /// to the default defended position with a logged warning.
    pub defended_position: Vec<i32>,
}

/// One army joining a side of the battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmyRoster {
    pub name: String,
    /// Army-wide troop morale, 0..=100
    pub morale: u32,
    /// The army's general; units without their own commander answer to them
    pub general: Option<Commander>,
    pub units: Vec<UnitRecord>,
    pub castle: Option<CastleRecord>,
    /// Identity the battle report is addressed to, if anyone is watching
    pub owner: Option<Uuid>,
}

impl ArmyRoster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            morale: 80,
            general: None,
            units: Vec::new(),
            castle: None,
            owner: None,
        }
    }
}

/// Final state of one unit after combat, for the caller to persist.
///
/// Destroyed units should be deleted; routed survivors take the usual
/// desertion penalty on top of their recorded losses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub unit_ref: Uuid,
    pub kind: UnitKind,
    pub quantity: u32,
    pub xp: i32,
    pub losses: u32,
    pub routed: bool,
    pub destroyed: bool,
}

/// Caller-supplied persistence and notification boundary.
///
/// Errors are caught and logged per side inside `end_combat`; they never
/// abort combat termination or the other side's save.
pub trait BattleSink {
    fn save_unit(&mut self, outcome: &UnitOutcome) -> Result<()>;
    fn deliver_report(&mut self, report: &BattleReport) -> Result<()>;
}

#[derive(Default)]
struct MemorySinkInner {
    units: Vec<UnitOutcome>,
    reports: Vec<BattleReport>,
}

/// In-memory sink; clones share the same log.
///
/// Used by the skirmish runner and by tests that need to observe what the
/// engine persisted.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Rc<RefCell<MemorySinkInner>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_units(&self) -> Vec<UnitOutcome> {
        self.inner.borrow().units.clone()
    }

    pub fn reports(&self) -> Vec<BattleReport> {
        self.inner.borrow().reports.clone()
    }
}

impl BattleSink for MemorySink {
    fn save_unit(&mut self, outcome: &UnitOutcome) -> Result<()> {
        self.inner.borrow_mut().units.push(outcome.clone());
        Ok(())
    }

    fn deliver_report(&mut self, report: &BattleReport) -> Result<()> {
        self.inner.borrow_mut().reports.push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_defaults() {
        let roster = ArmyRoster::new("Greenhaven Levies");
        assert_eq!(roster.morale, 80);
        assert!(roster.general.is_none());
        assert!(roster.units.is_empty());
        assert!(roster.castle.is_none());
    }

    #[test]
    fn test_memory_sink_clones_share_log() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();
        handle
            .save_unit(&UnitOutcome {
                unit_ref: Uuid::new_v4(),
                kind: UnitKind::Infantry,
                quantity: 42,
                xp: 5,
                losses: 8,
                routed: false,
                destroyed: false,
            })
            .unwrap();
        assert_eq!(sink.saved_units().len(), 1);
        assert_eq!(sink.saved_units()[0].quantity, 42);
    }
}
