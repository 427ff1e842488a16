//! Combat units: deployable blocks of same-type troops
//!
//! A unit carries the mutable per-round state of one troop block (damage
//! taken, losses, rout/destruction flags) and resolves its own rolls and
//! lifecycle transitions. Formations decide who it fights; the battle owns
//! the arena it lives in.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::battle::commander::Commander;
use crate::catalog::{Environment, UnitKind, UnitTypeDef};
use crate::core::types::{Side, UnitId};
use crate::grid::GridCoord;

/// A block of same-type troops fighting as one actor on the grid.
///
/// Lifecycle: active units fight; heavy losses can rout them; routed units
/// either rally back to active duty or are lost. Quantity hitting zero
/// destroys the unit outright. Destroyed and lost are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatUnit {
    /// Arena index within the battle
    pub id: UnitId,
    /// The caller's persistent id for this unit, echoed back at save time
    pub roster_ref: Uuid,
    pub side: Side,
    pub kind: UnitKind,
    pub stats: UnitTypeDef,
    pub quantity: u32,
    pub starting_quantity: u32,
    pub level: u32,
    pub equipment: u32,
    pub xp: i32,
    /// Troop morale, 0..=100
    pub morale: u32,
    /// Damage accumulated this cycle; converted to losses at cleanup
    pub damage: u64,
    /// Troopers lost over the whole battle
    pub losses: u32,
    pub routed: bool,
    pub destroyed: bool,
    /// Currently assaulting a castle position
    pub storming: bool,
    pub commander: Option<Commander>,
    /// Unit currently being engaged, if any
    pub target: Option<UnitId>,
    /// Castle coordinate to advance on when no target is available
    pub storm_objective: Option<GridCoord>,
    /// Level of the castle sheltering this unit, if inside one
    pub castle_level: Option<u32>,
    pub position: GridCoord,
}

impl CombatUnit {
    pub fn new(id: UnitId, side: Side, kind: UnitKind, stats: UnitTypeDef, quantity: u32) -> Self {
        Self {
            id,
            roster_ref: Uuid::new_v4(),
            side,
            kind,
            stats,
            quantity,
            starting_quantity: quantity,
            level: 0,
            equipment: 0,
            xp: 0,
            morale: 80,
            damage: 0,
            losses: 0,
            routed: false,
            destroyed: false,
            storming: false,
            commander: None,
            target: None,
            storm_objective: None,
            castle_level: None,
            position: GridCoord::default(),
        }
    }

    /// Still fighting: neither routed nor destroyed
    pub fn active(&self) -> bool {
        !self.routed && !self.destroyed
    }

    /// Targeting priority score; higher-value units draw focus fire
    pub fn value(&self) -> u64 {
        self.quantity as u64 * self.stats.silver_upkeep as u64
    }

    pub fn flies(&self) -> bool {
        self.stats.environment == Environment::Flying
    }

    /// Whether a position is within this unit's attack reach.
    ///
    /// Melee units have range 0, so they must share the target's cell.
    pub fn in_range(&self, target_pos: GridCoord) -> bool {
        self.position.chebyshev(&target_pos) <= self.stats.range
    }

    /// Damage per trooper for a melee exchange; storming troops use the
    /// storm profile instead
    pub fn melee_base(&self) -> u32 {
        if self.storming {
            self.stats.storm_damage
        } else {
            self.stats.melee_damage
        }
    }

    /// Roll this unit's attack for one swing.
    ///
    /// Full strength is damage-per-trooper times quantity, scaled by level
    /// and equipment; the roll has a floor of half that. A commander
    /// multiplies the rolled value by their warfare skill.
    pub fn attack_roll(&self, base_damage: u32, rng: &mut ChaCha8Rng) -> u64 {
        let attack = base_damage as u64
            * self.quantity as u64
            * (1 + self.level as u64)
            * (1 + self.equipment as u64);
        let mut roll = rng.gen_range(attack / 2..=attack);
        if let Some(commander) = &self.commander {
            roll += roll * commander.warfare as u64;
        }
        roll
    }

    /// Roll this unit's defense against a swing.
    ///
    /// Per-trooper defense only helps as far as there are attackers to
    /// resist, so it is capped by the smaller of the two quantities.
    /// Multi-defense instead grows with the attacker count: war machines
    /// and the like shrugging off swarms. Commanders and castle walls
    /// scale the rolled value.
    pub fn defense_roll(&self, attacker_quantity: u32, rng: &mut ChaCha8Rng) -> u64 {
        let per_trooper =
            self.stats.defense as u64 * (1 + self.level as u64) * (1 + self.equipment as u64);
        let engaged = self.quantity.min(attacker_quantity) as u64;
        let defense =
            per_trooper * engaged + self.stats.multi_defense as u64 * attacker_quantity as u64;
        let mut roll = rng.gen_range(0..=defense);
        if let Some(commander) = &self.commander {
            roll += roll * commander.warfare as u64;
        }
        if let Some(castle_level) = self.castle_level {
            roll += roll * castle_level as u64;
        }
        roll
    }

    /// Damage each trooper absorbs before dropping
    pub fn effective_hp(&self) -> u64 {
        self.stats.hp as u64 * (1 + self.level as u64) * (1 + self.equipment as u64)
    }

    /// Convert accumulated damage into losses and resolve rout/rally.
    ///
    /// Damage below one trooper's effective hp is carried forward to the
    /// next cycle. Quantity reaching zero destroys the unit.
    pub fn cleanup(&mut self, rng: &mut ChaCha8Rng) {
        if self.damage == 0 {
            return;
        }
        let hp = self.effective_hp();
        if self.damage >= hp {
            let killed = (self.damage / hp).min(self.quantity as u64) as u32;
            self.losses += killed;
            self.quantity -= killed;
            if self.quantity == 0 {
                self.destroyed = true;
                tracing::info!(unit = %self.label(), "unit destroyed");
                return;
            }
            self.damage %= hp;
            self.rout_check(rng);
        }
        if self.routed {
            self.rally_check(rng);
        }
    }

    /// Check whether the unit breaks and routs.
    ///
    /// Difficulty is the percentage of starting troops lost plus the
    /// shortfall from full morale, reduced 5 per troop level and 5 per
    /// point of commander warfare. Roll 1..=100; below difficulty routs.
    pub fn rout_check(&mut self, rng: &mut ChaCha8Rng) {
        let percent_losses =
            (self.losses as u64 * 100 / self.starting_quantity.max(1) as u64) as i64;
        let mut difficulty = percent_losses + (100 - self.morale as i64) - 5 * self.level as i64;
        if let Some(commander) = &self.commander {
            difficulty -= 5 * commander.warfare as i64;
        }
        let roll = rng.gen_range(1..=100i64);
        if roll < difficulty {
            self.routed = true;
            tracing::info!(unit = %self.label(), difficulty, roll, "unit routed");
        }
    }

    /// Attempt to rally a routed unit.
    ///
    /// Roll 1..=100 multiplied by the commander's warfare skill plus one,
    /// plus 10 per troop level; 100 or more rallies. Level 10 troops rally
    /// unconditionally even without a commander; elites reform on their
    /// own.
    pub fn rally_check(&mut self, rng: &mut ChaCha8Rng) {
        let warfare = self.commander.as_ref().map(|c| c.warfare).unwrap_or(0) as u64;
        let roll = rng.gen_range(1u64..=100) * (1 + warfare) + 10 * self.level as u64;
        tracing::debug!(unit = %self.label(), roll, "rally attempt");
        if roll >= 100 {
            self.routed = false;
            tracing::info!(unit = %self.label(), "unit rallied");
        }
    }

    /// Short display label for logs and reports
    pub fn label(&self) -> String {
        format!("{} {}({})", self.side, self.kind.name(), self.quantity)
    }
}
