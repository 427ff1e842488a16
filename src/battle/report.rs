//! Battle reports: post-battle snapshots for the host's notification system

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Starting strength, survivors and losses for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTally {
    pub name: String,
    pub starting: u32,
    pub remaining: u32,
    pub losses: u32,
}

/// Read-only summary of a finished battle, addressed to one owner.
///
/// Independent of the battle that produced it; hosts deliver the rendered
/// text through their own messaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub id: Uuid,
    pub owner: Uuid,
    /// Name of the winning side; None when neither side prevailed
    pub victor: Option<String>,
    pub attacker: String,
    pub defender: String,
    pub rounds: u32,
    pub attacker_units: Vec<UnitTally>,
    pub defender_units: Vec<UnitTally>,
}

impl BattleReport {
    /// Render the report as text
    pub fn render(&self) -> String {
        let victor = self
            .victor
            .as_deref()
            .unwrap_or("Neither side could claim decisive victory");
        let mut text = String::from("Battle Report\n");
        text.push_str(&format!("Victor: {}\n", victor));
        text.push_str(&format!(
            "(Attacker) {} vs (Defender) {}\n",
            self.attacker, self.defender
        ));
        text.push_str(&format!("Rounds fought: {}\n", self.rounds));
        text.push_str(&format!(
            "Attacking Units: {}\n",
            tally_line(&self.attacker_units, |t| t.starting)
        ));
        text.push_str(&format!(
            "Defending Units: {}\n",
            tally_line(&self.defender_units, |t| t.starting)
        ));
        text.push_str(&format!(
            "Attacker losses: {}\n",
            tally_line(&self.attacker_units, |t| t.losses)
        ));
        text.push_str(&format!(
            "Defender losses: {}\n",
            tally_line(&self.defender_units, |t| t.losses)
        ));
        text
    }
}

fn tally_line(tallies: &[UnitTally], pick: impl Fn(&UnitTally) -> u32) -> String {
    if tallies.is_empty() {
        return "none".into();
    }
    tallies
        .iter()
        .map(|t| format!("{}: {}", t.name, pick(t)))
        .collect::<Vec<_>>()
        .join(", ")
}
