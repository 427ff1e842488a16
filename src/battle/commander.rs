//! Unit commanders
//!
//! A commander's warfare skill scales attack and defense rolls and makes
//! routed troops far more likely to rally. Units without their own
//! commander inherit the army's general.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commander {
    pub name: String,
    /// Warfare skill; each point multiplies combat rolls by one more whole
    /// share and shaves 5 off rout difficulty
    pub warfare: u32,
}

impl Commander {
    pub fn new(name: impl Into<String>, warfare: u32) -> Self {
        Self {
            name: name.into(),
            warfare,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commander_creation() {
        let commander = Commander::new("Ser Alaric", 3);
        assert_eq!(commander.name, "Ser Alaric");
        assert_eq!(commander.warfare, 3);
    }
}
