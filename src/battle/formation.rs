//! Formations: one side's units, split into melee and ranged ranks
//!
//! A formation tracks which of its units are still fighting, which have
//! routed, and which are lost, and owns the targeting rules the enemy uses
//! against it. It holds arena indices only; unit data lives in the battle.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::castle::Castle;
use crate::battle::unit::CombatUnit;
use crate::core::types::{Side, UnitId};
use crate::grid::{GridCoord, SpatialGrid};

/// One side of a battle.
///
/// Invariant: every unit id is in exactly one of front_rank, back_rank,
/// lost_units, routed_units. Storming units are a subset of the active
/// ranks, not a fifth state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    pub side: Side,
    pub front_rank: Vec<UnitId>,
    pub back_rank: Vec<UnitId>,
    pub lost_units: Vec<UnitId>,
    pub routed_units: Vec<UnitId>,
    /// Enemy units currently assaulting our castle
    pub storming_units: Vec<UnitId>,
    pub castle: Option<Castle>,
    front_pos: GridCoord,
    back_pos: GridCoord,
}

impl Formation {
    pub fn new(side: Side, front_pos: GridCoord, back_pos: GridCoord) -> Self {
        Self {
            side,
            front_rank: Vec::new(),
            back_rank: Vec::new(),
            lost_units: Vec::new(),
            routed_units: Vec::new(),
            storming_units: Vec::new(),
            castle: None,
            front_pos,
            back_pos,
        }
    }

    /// Any units still fighting?
    pub fn has_active(&self) -> bool {
        !self.front_rank.is_empty() || !self.back_rank.is_empty()
    }

    /// Snapshot of the active ranks, front first
    pub fn active_ids(&self) -> Vec<UnitId> {
        self.front_rank
            .iter()
            .chain(self.back_rank.iter())
            .copied()
            .collect()
    }

    /// Every unit that ever fought for this side
    pub fn all_ids(&self) -> Vec<UnitId> {
        self.front_rank
            .iter()
            .chain(self.back_rank.iter())
            .chain(self.lost_units.iter())
            .chain(self.routed_units.iter())
            .copied()
            .collect()
    }

    /// Deploy a unit into its natural rank at the rank anchor.
    ///
    /// Ranged troops form the back rank; everyone else holds the front.
    pub fn add_unit(&mut self, units: &mut [CombatUnit], grid: &mut SpatialGrid, id: UnitId) {
        let ranged = units[id.index()].stats.range > 0;
        let anchor = if ranged { self.back_pos } else { self.front_pos };
        units[id.index()].position = anchor;
        grid.add(id, anchor);
        if ranged {
            self.back_rank.push(id);
        } else {
            self.front_rank.push(id);
        }
        if self.castle.is_some() {
            self.recall_to_castle(units, grid, id);
        }
    }

    /// Garrison a castle: every unit pulls back behind its walls
    pub fn set_castle(&mut self, units: &mut [CombatUnit], grid: &mut SpatialGrid, castle: Castle) {
        self.castle = Some(castle);
        for id in self.active_ids() {
            self.recall_to_castle(units, grid, id);
        }
        tracing::info!(side = %self.side, level = castle.level, "castle garrisoned");
    }

    fn recall_to_castle(&self, units: &mut [CombatUnit], grid: &mut SpatialGrid, id: UnitId) {
        let castle = match self.castle {
            Some(castle) => castle,
            None => return,
        };
        let from = units[id.index()].position;
        if from != castle.position {
            grid.relocate(id, from, castle.position);
            units[id.index()].position = castle.position;
        }
        units[id.index()].castle_level = Some(castle.level);
    }

    /// Pick a target from this formation for an enemy attacker.
    ///
    /// Open field: ranged attackers focus the highest-value unit anywhere;
    /// melee attackers take the highest-value front-ranker, falling back to
    /// the back rank only once the front is gone.
    ///
    /// Behind a castle, nothing can be engaged until somebody storms it.
    /// An attacker standing on the defended coordinate joins the storm;
    /// until the storm begins, ranged attackers may still trade fire with
    /// our back rank over the walls, while melee attackers are handed the
    /// castle coordinate as a movement objective instead of a target.
    pub fn target_for(&mut self, units: &mut [CombatUnit], attacker_id: UnitId) -> Option<UnitId> {
        if !self.has_active() {
            return None;
        }
        if let Some(castle) = self.castle {
            let attacker_pos = units[attacker_id.index()].position;
            if attacker_pos == castle.position && !self.storming_units.contains(&attacker_id) {
                self.storming_units.push(attacker_id);
                units[attacker_id.index()].storming = true;
                tracing::info!(
                    unit = %units[attacker_id.index()].label(),
                    "unit has reached the walls and is storming"
                );
            }
            if self.storming_units.is_empty() {
                if units[attacker_id.index()].stats.range > 0 {
                    if let Some(target) = highest_value(units, &self.back_rank) {
                        return Some(target);
                    }
                }
                units[attacker_id.index()].storm_objective = Some(castle.position);
                return None;
            }
        }
        if units[attacker_id.index()].stats.range > 0 {
            highest_value(
                units,
                self.front_rank.iter().chain(self.back_rank.iter()),
            )
        } else {
            highest_value(units, &self.front_rank)
                .or_else(|| highest_value(units, &self.back_rank))
        }
    }

    /// Acquire targets for every active unit against the enemy formation
    pub fn acquire_targets(&self, units: &mut [CombatUnit], enemy: &mut Formation) {
        for id in self.active_ids() {
            let target = enemy.target_for(units, id);
            units[id.index()].target = target;
        }
    }

    /// Give every routed unit a rally attempt; successes rejoin their
    /// natural rank at its anchor
    pub fn check_rally(
        &mut self,
        units: &mut [CombatUnit],
        grid: &mut SpatialGrid,
        rng: &mut ChaCha8Rng,
    ) {
        for id in self.routed_units.clone() {
            units[id.index()].rally_check(rng);
        }
        let rallied: Vec<UnitId> = self
            .routed_units
            .iter()
            .copied()
            .filter(|id| !units[id.index()].routed)
            .collect();
        for id in rallied {
            self.routed_units.retain(|routed| *routed != id);
            self.return_to_rank(units, grid, id);
        }
    }

    fn return_to_rank(&mut self, units: &mut [CombatUnit], grid: &mut SpatialGrid, id: UnitId) {
        let ranged = units[id.index()].stats.range > 0;
        let anchor = if ranged { self.back_pos } else { self.front_pos };
        let from = units[id.index()].position;
        if from != anchor {
            grid.relocate(id, from, anchor);
            units[id.index()].position = anchor;
        }
        if ranged {
            self.back_rank.push(id);
        } else {
            self.front_rank.push(id);
        }
        if self.castle.is_some() {
            self.recall_to_castle(units, grid, id);
        }
    }

    /// Movement phase: garrisons hold their castle, everyone else advances
    pub fn movement(&mut self, units: &mut [CombatUnit], grid: &mut SpatialGrid) {
        for id in self.active_ids() {
            if self.castle.is_some() {
                // no sorties; stragglers are pulled back inside
                self.recall_to_castle(units, grid, id);
                continue;
            }
            let unit = &units[id.index()];
            let destination = match unit.target {
                Some(target_id) if !unit.in_range(units[target_id.index()].position) => {
                    Some(units[target_id.index()].position)
                }
                Some(_) => None,
                None => unit.storm_objective,
            };
            if let Some(destination) = destination {
                let from = unit.position;
                let to = from.step_toward(destination, unit.stats.movement, unit.flies());
                if to != from {
                    grid.relocate(id, from, to);
                    units[id.index()].position = to;
                    tracing::debug!(unit = %units[id.index()].label(), %from, %to, "advanced");
                }
            }
        }
    }

    /// End-of-phase reconciliation.
    ///
    /// Units still routed from the previous cycle have failed every rally
    /// and are lost. Each active unit then settles its damage; the freshly
    /// destroyed move to the lost list and the freshly routed to the routed
    /// list, leaving whichever rank held them.
    pub fn cleanup(&mut self, units: &mut [CombatUnit], rng: &mut ChaCha8Rng) {
        if !self.routed_units.is_empty() {
            tracing::info!(
                side = %self.side,
                count = self.routed_units.len(),
                "routed units have fled the field"
            );
        }
        self.lost_units.append(&mut self.routed_units);

        let mut destroyed = Vec::new();
        let mut routed = Vec::new();
        for id in self.active_ids() {
            let unit = &mut units[id.index()];
            unit.cleanup(rng);
            if unit.destroyed {
                destroyed.push(id);
            } else if unit.routed {
                routed.push(id);
            }
        }
        self.remove_from_ranks(&destroyed);
        self.lost_units.extend(destroyed);
        self.remove_from_ranks(&routed);
        self.routed_units.extend(routed);
    }

    fn remove_from_ranks(&mut self, ids: &[UnitId]) {
        self.front_rank.retain(|id| !ids.contains(id));
        self.back_rank.retain(|id| !ids.contains(id));
    }
}

/// Highest-value unit among the given ids, if any
fn highest_value<'a, I>(units: &[CombatUnit], ids: I) -> Option<UnitId>
where
    I: IntoIterator<Item = &'a UnitId>,
{
    ids.into_iter()
        .copied()
        .max_by_key(|id| units[id.index()].value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UnitKind;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn push_unit(
        units: &mut Vec<CombatUnit>,
        side: Side,
        kind: UnitKind,
        quantity: u32,
    ) -> UnitId {
        let id = UnitId(units.len() as u32);
        units.push(CombatUnit::new(id, side, kind, kind.base_stats(), quantity));
        id
    }

    fn defender_formation() -> Formation {
        Formation::new(
            Side::Defender,
            GridCoord::new(0, 5, 0),
            GridCoord::new(0, 6, 0),
        )
    }

    #[test]
    fn test_placement_by_range() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let infantry = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 50);
        let archers = push_unit(&mut units, Side::Defender, UnitKind::Archers, 30);
        formation.add_unit(&mut units, &mut grid, infantry);
        formation.add_unit(&mut units, &mut grid, archers);

        assert_eq!(formation.front_rank, vec![infantry]);
        assert_eq!(formation.back_rank, vec![archers]);
        assert_eq!(units[infantry.index()].position, GridCoord::new(0, 5, 0));
        assert_eq!(units[archers.index()].position, GridCoord::new(0, 6, 0));
        assert_eq!(grid.units_at(GridCoord::new(0, 5, 0)), &[infantry]);
    }

    #[test]
    fn test_melee_attacker_prefers_front_rank() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let small = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 10);
        let large = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 90);
        let archers = push_unit(&mut units, Side::Defender, UnitKind::Archers, 200);
        for id in [small, large, archers] {
            formation.add_unit(&mut units, &mut grid, id);
        }
        let attacker = push_unit(&mut units, Side::Attacker, UnitKind::Infantry, 40);

        // archers are worth more, but melee hits the front rank first
        assert_eq!(formation.target_for(&mut units, attacker), Some(large));
    }

    #[test]
    fn test_melee_attacker_falls_back_to_back_rank() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let archers = push_unit(&mut units, Side::Defender, UnitKind::Archers, 20);
        formation.add_unit(&mut units, &mut grid, archers);
        let attacker = push_unit(&mut units, Side::Attacker, UnitKind::Infantry, 40);

        assert_eq!(formation.target_for(&mut units, attacker), Some(archers));
    }

    #[test]
    fn test_ranged_attacker_focuses_highest_value_anywhere() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let infantry = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 50);
        let cavalry = push_unit(&mut units, Side::Defender, UnitKind::Cavalry, 40);
        for id in [infantry, cavalry] {
            formation.add_unit(&mut units, &mut grid, id);
        }
        let archers = push_unit(&mut units, Side::Attacker, UnitKind::Archers, 30);

        // cavalry upkeep 15 x 40 = 600 beats infantry 5 x 50 = 250
        assert_eq!(formation.target_for(&mut units, archers), Some(cavalry));
    }

    #[test]
    fn test_empty_formation_yields_no_target() {
        let mut units = Vec::new();
        let mut formation = defender_formation();
        let attacker = push_unit(&mut units, Side::Attacker, UnitKind::Infantry, 40);
        assert_eq!(formation.target_for(&mut units, attacker), None);
    }

    #[test]
    fn test_castle_denies_melee_and_sets_objective() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let garrison = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 50);
        formation.add_unit(&mut units, &mut grid, garrison);
        let castle = Castle::new(2, GridCoord::new(0, 6, 0));
        formation.set_castle(&mut units, &mut grid, castle);
        assert_eq!(units[garrison.index()].position, castle.position);
        assert_eq!(units[garrison.index()].castle_level, Some(2));

        let attacker = push_unit(&mut units, Side::Attacker, UnitKind::Infantry, 40);
        units[attacker.index()].position = GridCoord::new(0, 1, 0);

        assert_eq!(formation.target_for(&mut units, attacker), None);
        assert_eq!(
            units[attacker.index()].storm_objective,
            Some(castle.position)
        );
    }

    #[test]
    fn test_castle_lets_ranged_trade_fire_over_walls() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let garrison_archers = push_unit(&mut units, Side::Defender, UnitKind::Archers, 30);
        formation.add_unit(&mut units, &mut grid, garrison_archers);
        formation.set_castle(&mut units, &mut grid, Castle::new(1, GridCoord::new(0, 6, 0)));

        let attacker_archers = push_unit(&mut units, Side::Attacker, UnitKind::Archers, 30);
        units[attacker_archers.index()].position = GridCoord::new(0, 0, 0);

        assert_eq!(
            formation.target_for(&mut units, attacker_archers),
            Some(garrison_archers)
        );
    }

    #[test]
    fn test_reaching_castle_starts_the_storm() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let garrison = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 50);
        formation.add_unit(&mut units, &mut grid, garrison);
        let castle = Castle::new(1, GridCoord::new(0, 6, 0));
        formation.set_castle(&mut units, &mut grid, castle);

        let attacker = push_unit(&mut units, Side::Attacker, UnitKind::Infantry, 40);
        units[attacker.index()].position = castle.position;

        // standing on the defended coordinate both joins the storm and
        // re-opens normal targeting
        assert_eq!(formation.target_for(&mut units, attacker), Some(garrison));
        assert_eq!(formation.storming_units, vec![attacker]);
        assert!(units[attacker.index()].storming);
    }

    #[test]
    fn test_rallied_unit_returns_to_rank() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let infantry = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 50);
        formation.add_unit(&mut units, &mut grid, infantry);

        units[infantry.index()].routed = true;
        units[infantry.index()].level = 10; // rallies unconditionally
        formation.front_rank.clear();
        formation.routed_units.push(infantry);

        formation.check_rally(&mut units, &mut grid, &mut rng());

        assert!(formation.routed_units.is_empty());
        assert_eq!(formation.front_rank, vec![infantry]);
        assert!(!units[infantry.index()].routed);
    }

    #[test]
    fn test_cleanup_reconciles_ranks() {
        let mut units = Vec::new();
        let mut grid = SpatialGrid::new();
        let mut formation = defender_formation();

        let doomed = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 2);
        let shaken = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 100);
        let stale = push_unit(&mut units, Side::Defender, UnitKind::Infantry, 40);
        for id in [doomed, shaken, stale] {
            formation.add_unit(&mut units, &mut grid, id);
        }

        // stale unit routed in an earlier cycle and never rallied
        units[stale.index()].routed = true;
        formation.front_rank.retain(|id| *id != stale);
        formation.routed_units.push(stale);

        // enough damage to wipe the small unit
        units[doomed.index()].damage = 90;
        // already broken mid-phase; cleanup must move it off the ranks
        units[shaken.index()].routed = true;

        formation.cleanup(&mut units, &mut rng());

        assert!(formation.lost_units.contains(&doomed));
        assert!(formation.lost_units.contains(&stale));
        assert_eq!(formation.routed_units, vec![shaken]);
        assert!(formation.front_rank.is_empty());

        // every unit sits in exactly one membership list
        for id in [doomed, shaken, stale] {
            let memberships = [
                formation.front_rank.contains(&id),
                formation.back_rank.contains(&id),
                formation.lost_units.contains(&id),
                formation.routed_units.contains(&id),
            ];
            assert_eq!(memberships.iter().filter(|m| **m).count(), 1);
        }
    }
}
