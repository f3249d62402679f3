//! Persistence-facing view of a combatant

use super::{Combatant, InstanceId, Team};
use serde::{Deserialize, Serialize};

/// Plain, sanitized snapshot of a combatant's state
///
/// Every number is finite. An undefined secondary resource is omitted rather
/// than written as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub instance_id: InstanceId,
    pub template_id: String,
    pub name: String,
    pub team: Team,
    pub level: u32,
    pub experience: u64,
    pub hp: f64,
    pub max_hp: f64,
    pub mana: f64,
    pub max_mana: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub secondary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_secondary: Option<f64>,
    pub shield: f64,
    pub effects: Vec<String>,
    pub talents: Vec<String>,
    pub dead: bool,
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl Combatant {
    /// Take a snapshot for persistence or display
    pub fn snapshot(&self, max_level: u32) -> CombatantSnapshot {
        let mut current = self.current.clone();
        current.sanitize();

        let max_secondary = current.max_secondary;
        let secondary = max_secondary.map(|max| finite(current.secondary.unwrap_or(max)));

        CombatantSnapshot {
            instance_id: self.instance_id,
            template_id: self.template_id().to_string(),
            name: self.name.clone(),
            team: self.team,
            level: self.experience.level(max_level),
            experience: self.experience.total(),
            hp: current.hp,
            max_hp: current.max_hp,
            mana: current.mana,
            max_mana: current.max_mana,
            secondary,
            max_secondary,
            shield: finite(self.shield()),
            effects: self.effects().iter().map(|e| e.id.clone()).collect(),
            talents: self.applied_talents().iter().cloned().collect(),
            dead: self.is_dead(),
        }
    }
}

impl CombatantSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defs_core::Attributes;

    #[test]
    fn test_snapshot_omits_undefined_secondary() {
        let combatant = Combatant::new("monk", "Monk", Attributes::default(), Team::Player);
        let json = combatant.snapshot(200).to_json().unwrap();
        assert!(!json.contains("secondary"));
    }

    #[test]
    fn test_snapshot_keeps_defined_secondary() {
        let base = Attributes {
            max_secondary: Some(30.0),
            ..Default::default()
        };
        let combatant = Combatant::new("rogue", "Rogue", base, Team::Player);
        let snapshot = combatant.snapshot(200);
        assert_eq!(snapshot.secondary, Some(30.0));

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["max_secondary"], serde_json::json!(30.0));
    }

    #[test]
    fn test_snapshot_sanitizes_non_finite() {
        let mut combatant = Combatant::new("golem", "Golem", Attributes::default(), Team::Opponent);
        combatant.current.hp = f64::NAN;
        combatant.current.max_mana = f64::INFINITY;

        let snapshot = combatant.snapshot(200);
        assert!((snapshot.hp - 0.0).abs() < f64::EPSILON);
        assert!((snapshot.max_mana - 0.0).abs() < f64::EPSILON);
        assert!(snapshot.to_json().is_ok());
    }
}
