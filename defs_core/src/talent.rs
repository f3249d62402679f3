//! Talent definitions - permanent, opt-in character modifications

use crate::types::{PropertyValue, Stat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arithmetic a talent applies to its target value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Set,
}

impl StatOperation {
    /// Combine `current` with `value`
    pub fn apply(&self, current: f64, value: f64) -> f64 {
        match self {
            StatOperation::Add => current + value,
            StatOperation::Subtract => current - value,
            StatOperation::Multiply => current * value,
            StatOperation::Set => value,
        }
    }
}

/// Which tier a stat talent names
///
/// There is no separate permanent non-base tier, so both variants end up
/// mutating the base record; the distinction is kept for data fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatTarget {
    #[default]
    Current,
    Base,
}

/// One declared effect of a talent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TalentEffect {
    ModifyStat {
        stat: Stat,
        #[serde(default)]
        operation: StatOperation,
        value: f64,
        #[serde(default)]
        target: StatTarget,
    },
    ModifyAbility {
        ability_id: String,
        property: String,
        #[serde(default)]
        operation: Option<StatOperation>,
        value: PropertyValue,
    },
    ModifyPassive {
        passive_id: String,
        property: String,
        value: PropertyValue,
    },
    ModifyCharacterProperty {
        property: String,
        value: PropertyValue,
    },
    /// Any effect type this build does not understand
    #[serde(other)]
    Unknown,
}

impl TalentEffect {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            TalentEffect::ModifyStat { .. } => "modify_stat",
            TalentEffect::ModifyAbility { .. } => "modify_ability",
            TalentEffect::ModifyPassive { .. } => "modify_passive",
            TalentEffect::ModifyCharacterProperty { .. } => "modify_character_property",
            TalentEffect::Unknown => "unknown",
        }
    }
}

/// A named talent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: Vec<TalentEffect>,
}

impl TalentDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        TalentDefinition {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: TalentEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// A character's talent tree: talent id -> definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TalentTree {
    #[serde(default)]
    talents: BTreeMap<String, TalentDefinition>,
}

impl TalentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a list of definitions (later ids win)
    pub fn from_definitions(definitions: impl IntoIterator<Item = TalentDefinition>) -> Self {
        let mut tree = Self::new();
        for def in definitions {
            tree.insert(def);
        }
        tree
    }

    pub fn insert(&mut self, definition: TalentDefinition) {
        self.talents.insert(definition.id.clone(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&TalentDefinition> {
        self.talents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.talents.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TalentDefinition> {
        self.talents.values()
    }

    pub fn len(&self) -> usize {
        self.talents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.talents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_operations() {
        assert!((StatOperation::Add.apply(10.0, 5.0) - 15.0).abs() < f64::EPSILON);
        assert!((StatOperation::Subtract.apply(10.0, 5.0) - 5.0).abs() < f64::EPSILON);
        assert!((StatOperation::Multiply.apply(10.0, 1.5) - 15.0).abs() < f64::EPSILON);
        assert!((StatOperation::Set.apply(10.0, 3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_talents() {
        let json = r#"{
            "talents": {
                "thick_skin": {
                    "id": "thick_skin",
                    "name": "Thick Skin",
                    "effects": [
                        { "type": "modify_stat", "stat": "armor", "operation": "add", "value": 10, "target": "base" },
                        { "type": "modify_ability", "ability_id": "bash", "property": "cooldown", "value": 1 },
                        { "type": "modify_character_property", "property": "cleanse_chance", "value": 0.25 },
                        { "type": "summon_meteor" }
                    ]
                }
            }
        }"#;

        let tree: TalentTree = serde_json::from_str(json).unwrap();
        let talent = tree.get("thick_skin").unwrap();
        assert_eq!(talent.effects.len(), 4);
        assert_eq!(talent.effects[0].kind(), "modify_stat");
        assert_eq!(talent.effects[3], TalentEffect::Unknown);

        match &talent.effects[0] {
            TalentEffect::ModifyStat { stat, target, .. } => {
                assert_eq!(*stat, Stat::Armor);
                assert_eq!(*target, StatTarget::Base);
            }
            other => panic!("Expected ModifyStat, got {:?}", other),
        }
    }
}
