//! Unit types and their combat stat blocks
//!
//! Every deployable unit kind is a closed enum variant carrying an immutable
//! stat template. Persisted rosters store a numeric type id; unknown ids
//! resolve to infantry with a logged warning rather than failing a battle.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Where a unit can be deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Ground,
    Naval,
    Flying,
}

/// Immutable combat stat template for one unit kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeDef {
    /// Damage per trooper in a melee exchange
    pub melee_damage: u32,
    /// Damage per trooper at range; zero for pure melee troops
    pub range_damage: u32,
    /// Damage per trooper when storming a castle
    pub storm_damage: u32,
    /// Per-trooper resistance, limited by the number of attackers
    pub defense: u32,
    /// Defense that scales with attacker count; lets a few very strong
    /// units resist being swarmed
    pub multi_defense: u32,
    /// Damage each trooper absorbs before becoming a casualty
    pub hp: u32,
    /// Reach of ranged attacks in grid cells; zero means none
    pub range: u32,
    /// Value in siege support
    pub siege: u32,
    /// Grid cells covered per movement phase
    pub movement: u32,
    /// Speed on the strategic map, outside battles
    pub strategic_speed: u32,
    pub environment: Environment,
    /// Military resources to recruit one trooper
    pub hiring_cost: u32,
    /// Weekly silver upkeep per trooper; doubles as the targeting value
    pub silver_upkeep: u32,
    /// Weekly food upkeep per trooper
    pub food_upkeep: u32,
    /// Extra damage taken from siege engines, dragon fire and the like
    pub structure_damage_multiplier: u32,
    /// Scales the xp cost of levelling the unit
    pub xp_cost_multiplier: u32,
}

impl Default for UnitTypeDef {
    fn default() -> Self {
        Self {
            melee_damage: 1,
            range_damage: 0,
            storm_damage: 0,
            defense: 0,
            multi_defense: 0,
            hp: 1,
            range: 0,
            siege: 0,
            movement: 0,
            strategic_speed: 0,
            environment: Environment::Ground,
            hiring_cost: 5,
            silver_upkeep: 10,
            food_upkeep: 1,
            structure_damage_multiplier: 1,
            xp_cost_multiplier: 1,
        }
    }
}

/// Kind of military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Infantry,
    Pike,
    Cavalry,
    Archers,
    Longship,
    SiegeWeapon,
    Galley,
    Dromond,
    Cog,
    Caravel,
}

impl UnitKind {
    /// Numeric type id used by persisted rosters
    pub fn id(self) -> u8 {
        match self {
            UnitKind::Infantry => 0,
            UnitKind::Pike => 1,
            UnitKind::Cavalry => 2,
            UnitKind::Archers => 3,
            UnitKind::Longship => 4,
            UnitKind::SiegeWeapon => 5,
            UnitKind::Galley => 6,
            UnitKind::Dromond => 7,
            UnitKind::Cog => 8,
            UnitKind::Caravel => 9,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(UnitKind::Infantry),
            1 => Some(UnitKind::Pike),
            2 => Some(UnitKind::Cavalry),
            3 => Some(UnitKind::Archers),
            4 => Some(UnitKind::Longship),
            5 => Some(UnitKind::SiegeWeapon),
            6 => Some(UnitKind::Galley),
            7 => Some(UnitKind::Dromond),
            8 => Some(UnitKind::Cog),
            9 => Some(UnitKind::Caravel),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UnitKind::Infantry => "Infantry",
            UnitKind::Pike => "Pike",
            UnitKind::Cavalry => "Cavalry",
            UnitKind::Archers => "Archers",
            UnitKind::Longship => "Longships",
            UnitKind::SiegeWeapon => "Siege Weapon",
            UnitKind::Galley => "Galleys",
            UnitKind::Dromond => "Dromonds",
            UnitKind::Cog => "Cogs",
            UnitKind::Caravel => "Caravels",
        }
    }

    /// Key used for stat overrides in config files
    pub fn key(self) -> &'static str {
        match self {
            UnitKind::Infantry => "infantry",
            UnitKind::Pike => "pike",
            UnitKind::Cavalry => "cavalry",
            UnitKind::Archers => "archers",
            UnitKind::Longship => "longship",
            UnitKind::SiegeWeapon => "siege_weapon",
            UnitKind::Galley => "galley",
            UnitKind::Dromond => "dromond",
            UnitKind::Cog => "cog",
            UnitKind::Caravel => "caravel",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.key() == key)
    }

    pub fn all() -> [UnitKind; 10] {
        [
            UnitKind::Infantry,
            UnitKind::Pike,
            UnitKind::Cavalry,
            UnitKind::Archers,
            UnitKind::Longship,
            UnitKind::SiegeWeapon,
            UnitKind::Galley,
            UnitKind::Dromond,
            UnitKind::Cog,
            UnitKind::Caravel,
        ]
    }

    /// Base stat template for this kind
    pub fn base_stats(self) -> UnitTypeDef {
        let default = UnitTypeDef::default();
        match self {
            UnitKind::Infantry => UnitTypeDef {
                melee_damage: 3,
                storm_damage: 3,
                defense: 1,
                hp: 30,
                movement: 2,
                strategic_speed: 2,
                hiring_cost: 10,
                silver_upkeep: 5,
                ..default
            },

            UnitKind::Pike => UnitTypeDef {
                melee_damage: 5,
                storm_damage: 3,
                defense: 1,
                hp: 30,
                movement: 2,
                strategic_speed: 2,
                hiring_cost: 15,
                silver_upkeep: 8,
                ..default
            },

            UnitKind::Cavalry => UnitTypeDef {
                melee_damage: 10,
                storm_damage: 3,
                defense: 3,
                hp: 60,
                movement: 6,
                strategic_speed: 2,
                hiring_cost: 30,
                silver_upkeep: 15,
                xp_cost_multiplier: 2,
                ..default
            },

            UnitKind::Archers => UnitTypeDef {
                melee_damage: 1,
                range_damage: 5,
                storm_damage: 3,
                defense: 1,
                hp: 20,
                range: 6,
                siege: 5,
                movement: 2,
                strategic_speed: 2,
                hiring_cost: 20,
                silver_upkeep: 10,
                xp_cost_multiplier: 2,
                ..default
            },

            UnitKind::Longship => UnitTypeDef {
                melee_damage: 60,
                range_damage: 100,
                hp: 500,
                movement: 6,
                strategic_speed: 12,
                environment: Environment::Naval,
                hiring_cost: 150,
                silver_upkeep: 75,
                food_upkeep: 20,
                structure_damage_multiplier: 20,
                xp_cost_multiplier: 10,
                ..default
            },

            UnitKind::SiegeWeapon => UnitTypeDef {
                melee_damage: 20,
                range_damage: 300,
                storm_damage: 600,
                defense: 10,
                hp: 400,
                movement: 1,
                strategic_speed: 1,
                hiring_cost: 1000,
                silver_upkeep: 500,
                food_upkeep: 20,
                structure_damage_multiplier: 20,
                xp_cost_multiplier: 30,
                ..default
            },

            UnitKind::Galley => UnitTypeDef {
                melee_damage: 240,
                range_damage: 400,
                hp: 2000,
                movement: 5,
                strategic_speed: 10,
                environment: Environment::Naval,
                hiring_cost: 500,
                silver_upkeep: 250,
                food_upkeep: 60,
                structure_damage_multiplier: 20,
                xp_cost_multiplier: 50,
                ..default
            },

            UnitKind::Dromond => UnitTypeDef {
                melee_damage: 2500,
                range_damage: 5000,
                hp: 20000,
                movement: 3,
                strategic_speed: 8,
                environment: Environment::Naval,
                hiring_cost: 2000,
                silver_upkeep: 1000,
                food_upkeep: 300,
                structure_damage_multiplier: 20,
                xp_cost_multiplier: 100,
                ..default
            },

            UnitKind::Cog => UnitTypeDef {
                melee_damage: 700,
                range_damage: 2000,
                hp: 5000,
                movement: 6,
                strategic_speed: 12,
                environment: Environment::Naval,
                hiring_cost: 1000,
                silver_upkeep: 500,
                food_upkeep: 120,
                xp_cost_multiplier: 75,
                ..default
            },

            UnitKind::Caravel => UnitTypeDef {
                melee_damage: 5000,
                range_damage: 15000,
                hp: 50000,
                movement: 6,
                strategic_speed: 12,
                environment: Environment::Naval,
                hiring_cost: 10000,
                silver_upkeep: 10000,
                food_upkeep: 500,
                structure_damage_multiplier: 20,
                xp_cost_multiplier: 100,
                ..default
            },
        }
    }
}

/// Partial stat override, applied on top of a kind's base template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatOverride {
    pub melee_damage: Option<u32>,
    pub range_damage: Option<u32>,
    pub storm_damage: Option<u32>,
    pub defense: Option<u32>,
    pub multi_defense: Option<u32>,
    pub hp: Option<u32>,
    pub range: Option<u32>,
    pub siege: Option<u32>,
    pub movement: Option<u32>,
    pub strategic_speed: Option<u32>,
    pub hiring_cost: Option<u32>,
    pub silver_upkeep: Option<u32>,
    pub food_upkeep: Option<u32>,
    pub structure_damage_multiplier: Option<u32>,
    pub xp_cost_multiplier: Option<u32>,
}

impl StatOverride {
    fn apply(&self, stats: &mut UnitTypeDef) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    stats.$field = value;
                })*
            };
        }
        merge!(
            melee_damage,
            range_damage,
            storm_damage,
            defense,
            multi_defense,
            hp,
            range,
            siege,
            movement,
            strategic_speed,
            hiring_cost,
            silver_upkeep,
            food_upkeep,
            structure_damage_multiplier,
            xp_cost_multiplier
        );
    }
}

/// Read-only table of per-kind combat stats.
///
/// Constructed once and passed into each battle; never mutated at runtime.
#[derive(Debug, Clone)]
pub struct UnitTypeCatalog {
    stats: AHashMap<UnitKind, UnitTypeDef>,
}

impl Default for UnitTypeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl UnitTypeCatalog {
    /// Catalog with the standard stat tables
    pub fn standard() -> Self {
        let stats = UnitKind::all()
            .into_iter()
            .map(|kind| (kind, kind.base_stats()))
            .collect();
        Self { stats }
    }

    /// Catalog with stat overrides parsed from TOML, keyed by kind:
    ///
    /// ```toml
    /// [infantry]
    /// melee_damage = 4
    /// hp = 35
    /// ```
    pub fn with_overrides(toml_text: &str) -> Result<Self> {
        let overrides: AHashMap<String, StatOverride> = toml::from_str(toml_text)?;
        let mut catalog = Self::standard();
        for (key, patch) in &overrides {
            match UnitKind::from_key(key) {
                Some(kind) => {
                    let stats = catalog.stats.entry(kind).or_insert_with(|| kind.base_stats());
                    patch.apply(stats);
                }
                None => {
                    tracing::warn!(key = %key, "ignoring stat override for unknown unit kind");
                }
            }
        }
        Ok(catalog)
    }

    /// Stats for a known kind
    pub fn stats(&self, kind: UnitKind) -> UnitTypeDef {
        self.stats
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.base_stats())
    }

    /// Resolve a persisted type id. Unknown ids fall back to infantry;
    /// a battle is never aborted over a bad unit row.
    pub fn resolve(&self, type_id: u8) -> (UnitKind, UnitTypeDef) {
        let kind = UnitKind::from_id(type_id).unwrap_or_else(|| {
            tracing::warn!(type_id, "unknown unit type id, falling back to infantry");
            UnitKind::Infantry
        });
        (kind, self.stats(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for kind in UnitKind::all() {
            assert_eq!(UnitKind::from_id(kind.id()), Some(kind));
        }
    }

    #[test]
    fn test_key_round_trip() {
        for kind in UnitKind::all() {
            assert_eq!(UnitKind::from_key(kind.key()), Some(kind));
        }
    }

    #[test]
    fn test_only_archers_shoot() {
        let ranged: Vec<UnitKind> = UnitKind::all()
            .into_iter()
            .filter(|k| k.base_stats().range > 0)
            .collect();
        assert_eq!(ranged, vec![UnitKind::Archers]);
    }

    #[test]
    fn test_ships_are_naval() {
        for kind in [
            UnitKind::Longship,
            UnitKind::Galley,
            UnitKind::Dromond,
            UnitKind::Cog,
            UnitKind::Caravel,
        ] {
            assert_eq!(kind.base_stats().environment, Environment::Naval);
        }
        assert_eq!(
            UnitKind::Infantry.base_stats().environment,
            Environment::Ground
        );
    }

    #[test]
    fn test_unknown_id_falls_back_to_infantry() {
        let catalog = UnitTypeCatalog::standard();
        let (kind, stats) = catalog.resolve(250);
        assert_eq!(kind, UnitKind::Infantry);
        assert_eq!(stats, UnitKind::Infantry.base_stats());
    }

    #[test]
    fn test_overrides_patch_selected_fields() {
        let catalog = UnitTypeCatalog::with_overrides(
            "[infantry]\nmelee_damage = 4\nhp = 35\n\n[archers]\nrange = 8\n",
        )
        .unwrap();
        let infantry = catalog.stats(UnitKind::Infantry);
        assert_eq!(infantry.melee_damage, 4);
        assert_eq!(infantry.hp, 35);
        // untouched fields keep their base values
        assert_eq!(infantry.defense, 1);
        assert_eq!(catalog.stats(UnitKind::Archers).range, 8);
        assert_eq!(catalog.stats(UnitKind::Pike), UnitKind::Pike.base_stats());
    }

    #[test]
    fn test_overrides_reject_unknown_fields() {
        assert!(UnitTypeCatalog::with_overrides("[infantry]\nbogus = 1\n").is_err());
    }

    #[test]
    fn test_overrides_ignore_unknown_kind() {
        let catalog = UnitTypeCatalog::with_overrides("[dragon]\nhp = 9000\n").unwrap();
        assert_eq!(
            catalog.stats(UnitKind::Infantry),
            UnitKind::Infantry.base_stats()
        );
    }
}
