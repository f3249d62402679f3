//! Parsed character, ability and passive definitions

use crate::types::{Attributes, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Who an ability may be pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[default]
    Enemy,
    Ally,
    #[serde(rename = "self")]
    SelfOnly,
    AllEnemies,
    AllAllies,
}

impl TargetType {
    /// Whether `use_ability` must be given an explicit target
    pub fn requires_target(&self) -> bool {
        matches!(self, TargetType::Enemy | TargetType::Ally)
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enemy" => Ok(TargetType::Enemy),
            "ally" => Ok(TargetType::Ally),
            "self" => Ok(TargetType::SelfOnly),
            "all_enemies" => Ok(TargetType::AllEnemies),
            "all_allies" => Ok(TargetType::AllAllies),
            other => Err(format!("Unknown target type: {}", other)),
        }
    }
}

/// Which pool an ability's cost is paid from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    Mana,
    Secondary,
}

/// An ability as parsed from character data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDescriptor {
    pub id: String,
    pub name: String,
    /// Template with `{cooldown}`, `{cost}` and `{<param>}` placeholders
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub resource: ResourceKind,
    /// Cooldown in turns applied after each use
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub target_type: TargetType,
    /// Handler id resolved by the combat core's ability factory
    #[serde(default)]
    pub effect: Option<String>,
    /// Free-form effect parameters (damage coefficient, damage type, ...)
    #[serde(default)]
    pub params: BTreeMap<String, PropertyValue>,
}

impl AbilityDescriptor {
    /// Create a descriptor with no cost, cooldown or parameters
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        AbilityDescriptor {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            cost: 0.0,
            resource: ResourceKind::Mana,
            cooldown: 0,
            target_type: TargetType::Enemy,
            effect: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_effect(mut self, handler: impl Into<String>) -> Self {
        self.effect = Some(handler.into());
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_target(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_description(mut self, template: impl Into<String>) -> Self {
        self.description = template.into();
        self
    }
}

/// A character's innate passive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl PassiveDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        PassiveDescriptor {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Read a numeric passive property
    pub fn number(&self, property: &str) -> Option<f64> {
        self.properties.get(property).and_then(PropertyValue::as_f64)
    }
}

/// A character template as parsed from data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub faction: Option<String>,
    #[serde(default)]
    pub base: Attributes,
    #[serde(default)]
    pub abilities: Vec<AbilityDescriptor>,
    #[serde(default)]
    pub passive: Option<PassiveDescriptor>,
}

impl CharacterDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base: Attributes) -> Self {
        CharacterDefinition {
            id: id.into(),
            name: name.into(),
            faction: None,
            base,
            abilities: Vec::new(),
            passive: None,
        }
    }

    pub fn with_ability(mut self, ability: AbilityDescriptor) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_passive(mut self, passive: PassiveDescriptor) -> Self {
        self.passive = Some(passive);
        self
    }

    pub fn with_faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    /// Find an ability descriptor by id
    pub fn ability(&self, id: &str) -> Option<&AbilityDescriptor> {
        self.abilities.iter().find(|a| a.id == id)
    }
}
