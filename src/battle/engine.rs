//! Battle orchestration: the round loop over two formations
//!
//! A battle is constructed once from army rosters, run once, and discarded.
//! It owns the unit arena, the grid, the round counter and the injected
//! random source; formations and the grid refer to units by arena index.

use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::battle::castle::Castle;
use crate::battle::formation::Formation;
use crate::battle::report::{BattleReport, UnitTally};
use crate::battle::roster::{ArmyRoster, BattleSink, UnitOutcome};
use crate::battle::unit::CombatUnit;
use crate::catalog::UnitTypeCatalog;
use crate::core::config::EngineConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleOutcome, Side, UnitId};
use crate::grid::{GridCoord, SpatialGrid};

/// A single battle between two merged formations.
///
/// The whole round loop runs synchronously inside one call to [`Battle::run`];
/// the injected RNG is the only source of nondeterminism, so a fixed seed
/// replays an identical battle.
pub struct Battle {
    config: EngineConfig,
    pub units: Vec<CombatUnit>,
    pub attacker: Formation,
    pub defender: Formation,
    pub grid: SpatialGrid,
    rng: ChaCha8Rng,
    pub round: u32,
    pub outcome: BattleOutcome,
    pub attacker_name: String,
    pub defender_name: String,
    attacker_owner: Option<Uuid>,
    defender_owner: Option<Uuid>,
    attacker_sink: Option<Box<dyn BattleSink>>,
    defender_sink: Option<Box<dyn BattleSink>>,
    /// Reports generated at end of combat, one per side with an owner
    pub reports: Vec<BattleReport>,
    ended: bool,
}

impl Battle {
    /// Build a battle from one-or-more army rosters per side.
    ///
    /// Armies on the same side merge into a single formation. The first
    /// defending army with a castle fortifies the whole defense. Supplying
    /// no armies at all is the one construction error; armies with empty
    /// unit lists are fine and resolve as an immediate draw.
    pub fn new(
        attacker_armies: &[ArmyRoster],
        defender_armies: &[ArmyRoster],
        catalog: &UnitTypeCatalog,
        config: EngineConfig,
        rng: ChaCha8Rng,
    ) -> Result<Battle> {
        config.validate()?;
        if attacker_armies.is_empty() && defender_armies.is_empty() {
            return Err(BattleError::NoRosters);
        }

        let mut battle = Battle {
            attacker: Formation::new(Side::Attacker, config.attacker_front, config.attacker_back),
            defender: Formation::new(Side::Defender, config.defender_front, config.defender_back),
            config,
            units: Vec::new(),
            grid: SpatialGrid::new(),
            rng,
            round: 0,
            outcome: BattleOutcome::Undecided,
            attacker_name: side_name(attacker_armies),
            defender_name: side_name(defender_armies),
            attacker_owner: attacker_armies.iter().find_map(|a| a.owner),
            defender_owner: defender_armies.iter().find_map(|a| a.owner),
            attacker_sink: None,
            defender_sink: None,
            reports: Vec::new(),
            ended: false,
        };

        for roster in attacker_armies {
            battle.add_army(Side::Attacker, roster, catalog);
        }
        for roster in defender_armies {
            battle.add_army(Side::Defender, roster, catalog);
        }
        tracing::info!(
            attacker = %battle.attacker_name,
            defender = %battle.defender_name,
            attacker_units = battle.attacker.active_ids().len(),
            defender_units = battle.defender.active_ids().len(),
            "battle assembled"
        );
        Ok(battle)
    }

    /// Attach the persistence/notification sink for the attacking side
    pub fn set_attacker_sink(&mut self, sink: Box<dyn BattleSink>) {
        self.attacker_sink = Some(sink);
    }

    /// Attach the persistence/notification sink for the defending side
    pub fn set_defender_sink(&mut self, sink: Box<dyn BattleSink>) {
        self.defender_sink = Some(sink);
    }

    fn add_army(&mut self, side: Side, roster: &ArmyRoster, catalog: &UnitTypeCatalog) {
        for record in &roster.units {
            let id = UnitId(self.units.len() as u32);
            let (kind, stats) = catalog.resolve(record.type_id);
            let mut unit = CombatUnit::new(id, side, kind, stats, record.quantity);
            unit.roster_ref = record.id;
            unit.level = record.level;
            unit.equipment = record.equipment;
            unit.xp = record.xp;
            unit.morale = roster.morale.min(100);
            unit.commander = record.commander.clone().or_else(|| roster.general.clone());
            self.units.push(unit);
            let formation = match side {
                Side::Attacker => &mut self.attacker,
                Side::Defender => &mut self.defender,
            };
            formation.add_unit(&mut self.units, &mut self.grid, id);
        }

        // only defenders bring fortifications to the field
        if side == Side::Defender && self.defender.castle.is_none() {
            if let Some(record) = &roster.castle {
                let position = GridCoord::from_slice(&record.defended_position)
                    .unwrap_or_else(|| {
                        tracing::warn!(
                            raw = ?record.defended_position,
                            "malformed castle coordinate, using default defended position"
                        );
                        self.config.defender_back
                    });
                let castle = Castle::new(record.level, position);
                self.defender
                    .set_castle(&mut self.units, &mut self.grid, castle);
            }
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Resolve the battle: run rounds until a side is eliminated, both are,
    /// or the round cap forces a stalemate. Idempotent once ended.
    pub fn run(&mut self) -> BattleOutcome {
        tracing::info!(
            attacker = %self.attacker_name,
            defender = %self.defender_name,
            "combat begins"
        );
        while !self.ended {
            self.round += 1;
            tracing::info!(round = self.round, "round start");
            if self.round > self.config.max_rounds {
                tracing::info!("round limit reached, ending with no victor");
                // the extra round never happened
                self.round = self.config.max_rounds;
                self.outcome = BattleOutcome::Draw;
                self.end_combat();
                break;
            }
            if self.check_victory() {
                self.end_combat();
                break;
            }

            // rally the routed, then pick targets for everyone
            self.attacker
                .check_rally(&mut self.units, &mut self.grid, &mut self.rng);
            self.attacker
                .acquire_targets(&mut self.units, &mut self.defender);
            self.defender
                .check_rally(&mut self.units, &mut self.grid, &mut self.rng);
            self.defender
                .acquire_targets(&mut self.units, &mut self.attacker);

            // ranged fire can decide the battle before anyone moves
            self.ranged_phase();
            self.cleanup_phase();
            if self.ended {
                break;
            }

            self.movement_phase();
            self.melee_phase();
            self.cleanup_phase();
        }
        self.outcome
    }

    /// Both sides exchange ranged fire; one-directional per shooter
    fn ranged_phase(&mut self) {
        Self::formation_ranged(&mut self.units, &mut self.rng, &self.attacker);
        Self::formation_ranged(&mut self.units, &mut self.rng, &self.defender);
    }

    fn formation_ranged(units: &mut [CombatUnit], rng: &mut ChaCha8Rng, formation: &Formation) {
        for id in formation.active_ids() {
            let unit = &units[id.index()];
            if unit.stats.range == 0 {
                continue;
            }
            let Some(target_id) = unit.target else {
                continue;
            };
            if !unit.in_range(units[target_id.index()].position) {
                continue;
            }
            let base = unit.stats.range_damage;
            swing(units, rng, id, target_id, base);
        }
    }

    /// Repositioning only; no damage is dealt
    fn movement_phase(&mut self) {
        self.attacker.movement(&mut self.units, &mut self.grid);
        self.defender.movement(&mut self.units, &mut self.grid);
    }

    /// Both sides fight hand to hand; every exchange is reciprocal
    fn melee_phase(&mut self) {
        Self::formation_melee(&mut self.units, &mut self.rng, &self.attacker);
        Self::formation_melee(&mut self.units, &mut self.rng, &self.defender);
    }

    fn formation_melee(units: &mut [CombatUnit], rng: &mut ChaCha8Rng, formation: &Formation) {
        for id in formation.active_ids() {
            let unit = &units[id.index()];
            let Some(target_id) = unit.target else {
                continue;
            };
            if !unit.in_range(units[target_id.index()].position) {
                continue;
            }
            let base = unit.melee_base();
            swing(units, rng, id, target_id, base);
            // the defender swings back in the same exchange
            let counter = units[target_id.index()].stats.melee_damage;
            swing(units, rng, target_id, id, counter);
        }
    }

    /// Settle damage on both sides, then see whether anyone is left
    fn cleanup_phase(&mut self) {
        self.attacker.cleanup(&mut self.units, &mut self.rng);
        self.defender.cleanup(&mut self.units, &mut self.rng);
        if self.check_victory() {
            self.end_combat();
        }
    }

    /// A side with no active units has lost; both empty is a draw
    fn check_victory(&mut self) -> bool {
        match (self.attacker.has_active(), self.defender.has_active()) {
            (true, true) => false,
            (true, false) => {
                self.outcome = BattleOutcome::AttackerWin;
                tracing::info!(victor = %self.attacker_name, "victor declared");
                true
            }
            (false, true) => {
                self.outcome = BattleOutcome::DefenderWin;
                tracing::info!(victor = %self.defender_name, "victor declared");
                true
            }
            (false, false) => {
                self.outcome = BattleOutcome::Draw;
                tracing::info!("both formations empty, no victor");
                true
            }
        }
    }

    /// Persist final unit state and deliver reports.
    ///
    /// Guarded: only the first call does anything. A failure on one side is
    /// logged and never blocks the other side or combat termination.
    pub fn end_combat(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        tracing::info!(outcome = ?self.outcome, rounds = self.round, "combat ended");

        let attacker_report = self.attacker_owner.map(|owner| self.build_report(owner));
        let defender_report = self.defender_owner.map(|owner| self.build_report(owner));

        let xp = self.config.xp_per_battle;
        flush_side(
            &self.units,
            &self.attacker,
            self.attacker_sink.as_deref_mut(),
            attacker_report.as_ref(),
            xp,
        );
        flush_side(
            &self.units,
            &self.defender,
            self.defender_sink.as_deref_mut(),
            defender_report.as_ref(),
            xp,
        );
        self.reports.extend(attacker_report);
        self.reports.extend(defender_report);
    }

    fn build_report(&self, owner: Uuid) -> BattleReport {
        let victor = match self.outcome {
            BattleOutcome::AttackerWin => Some(self.attacker_name.clone()),
            BattleOutcome::DefenderWin => Some(self.defender_name.clone()),
            _ => None,
        };
        BattleReport {
            id: Uuid::new_v4(),
            owner,
            victor,
            attacker: self.attacker_name.clone(),
            defender: self.defender_name.clone(),
            rounds: self.round,
            attacker_units: tally(&self.units, &self.attacker),
            defender_units: tally(&self.units, &self.defender),
        }
    }
}

/// One attack roll against one defense roll; the margin lands on the
/// target as accumulated damage, never below zero
fn swing(
    units: &mut [CombatUnit],
    rng: &mut ChaCha8Rng,
    attacker: UnitId,
    target: UnitId,
    base_damage: u32,
) {
    let atk_roll = units[attacker.index()].attack_roll(base_damage, rng);
    let attacker_quantity = units[attacker.index()].quantity;
    let def_roll = units[target.index()].defense_roll(attacker_quantity, rng);
    let damage = atk_roll.saturating_sub(def_roll);
    units[target.index()].damage += damage;
    tracing::debug!(
        attacker = %units[attacker.index()].label(),
        target = %units[target.index()].label(),
        atk_roll,
        def_roll,
        damage,
        "swing"
    );
}

fn side_name(armies: &[ArmyRoster]) -> String {
    armies
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "Unknown".into())
}

fn tally(units: &[CombatUnit], formation: &Formation) -> Vec<UnitTally> {
    formation
        .all_ids()
        .iter()
        .map(|id| {
            let unit = &units[id.index()];
            UnitTally {
                name: unit.kind.name().into(),
                starting: unit.starting_quantity,
                remaining: unit.quantity,
                losses: unit.losses,
            }
        })
        .collect()
}

/// Save every unit of one side and deliver its report, isolating failures
fn flush_side(
    units: &[CombatUnit],
    formation: &Formation,
    sink: Option<&mut (dyn BattleSink + 'static)>,
    report: Option<&BattleReport>,
    xp_award: i32,
) {
    let Some(sink) = sink else {
        return;
    };
    for id in formation.all_ids() {
        let unit = &units[id.index()];
        let outcome = UnitOutcome {
            unit_ref: unit.roster_ref,
            kind: unit.kind,
            quantity: unit.quantity,
            xp: if unit.destroyed {
                unit.xp
            } else {
                unit.xp + xp_award
            },
            losses: unit.losses,
            routed: unit.routed,
            destroyed: unit.destroyed,
        };
        if let Err(error) = sink.save_unit(&outcome) {
            tracing::error!(side = %formation.side, %error, "failed to save unit state");
        }
    }
    if let Some(report) = report {
        if let Err(error) = sink.deliver_report(report) {
            tracing::error!(side = %formation.side, %error, "failed to deliver battle report");
        }
    }
}
