//! Engine configuration with documented constants
//!
//! All tunable values for battle resolution are collected here with
//! explanations of their purpose and how they interact with each other.

use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};
use crate::grid::GridCoord;

/// Configuration for battle resolution
///
/// These values have been tuned to produce battles that usually resolve by
/// rout rather than annihilation. Changing them affects pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on combat rounds
    ///
    /// A battle still undecided after this many rounds ends as a stalemate
    /// with no victor. Keeps degenerate matchups (two units that cannot
    /// hurt each other) from looping forever.
    pub max_rounds: u32,

    /// Experience granted to every unit that survives a battle
    ///
    /// Applied at save time; battles teach troops far more than weekly
    /// drills do.
    pub xp_per_battle: i32,

    /// Deployment anchor for the attacker's melee rank
    pub attacker_front: GridCoord,

    /// Deployment anchor for the attacker's ranged rank
    pub attacker_back: GridCoord,

    /// Deployment anchor for the defender's melee rank
    pub defender_front: GridCoord,

    /// Deployment anchor for the defender's ranged rank
    ///
    /// Also the fallback position for a castle whose defended coordinate
    /// is missing or malformed.
    pub defender_back: GridCoord,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 30,
            xp_per_battle: 5,
            attacker_front: GridCoord::new(0, 1, 0),
            attacker_back: GridCoord::new(0, 0, 0),
            defender_front: GridCoord::new(0, 5, 0),
            defender_back: GridCoord::new(0, 6, 0),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text, validating it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(BattleError::InvalidConfig(
                "max_rounds must be at least 1".into(),
            ));
        }

        // Ranks sharing an anchor would put melee and ranged troops in the
        // same cell and break castle recall bookkeeping.
        if self.attacker_front == self.attacker_back {
            return Err(BattleError::InvalidConfig(
                "attacker front and back anchors must differ".into(),
            ));
        }
        if self.defender_front == self.defender_back {
            return Err(BattleError::InvalidConfig(
                "defender front and back anchors must differ".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let mut config = EngineConfig::default();
        config.max_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_anchor_rejected() {
        let mut config = EngineConfig::default();
        config.defender_front = config.defender_back;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str("max_rounds = 12").unwrap();
        assert_eq!(config.max_rounds, 12);
        assert_eq!(config.xp_per_battle, 5);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(EngineConfig::from_toml_str("max_rounds = 0").is_err());
    }
}
