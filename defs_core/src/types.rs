//! Attribute model shared by definitions and the combat core

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Stat addressing
// ============================================================================

/// Every numeric, non-resource attribute a modifier or talent can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    PhysicalDamage,
    MagicalDamage,
    Armor,
    MagicalResistance,
    Lifesteal,
    DodgeChance,
    CritChance,
    CritMultiplier,
    HealingPower,
    HealingReceived,
    DamageReduction,
    MaxHp,
    MaxMana,
    HpPerTurn,
    ManaPerTurn,
    Speed,
    MaxSecondary,
}

impl Stat {
    /// Get all addressable stats
    pub fn all() -> &'static [Stat] {
        &[
            Stat::PhysicalDamage,
            Stat::MagicalDamage,
            Stat::Armor,
            Stat::MagicalResistance,
            Stat::Lifesteal,
            Stat::DodgeChance,
            Stat::CritChance,
            Stat::CritMultiplier,
            Stat::HealingPower,
            Stat::HealingReceived,
            Stat::DamageReduction,
            Stat::MaxHp,
            Stat::MaxMana,
            Stat::HpPerTurn,
            Stat::ManaPerTurn,
            Stat::Speed,
            Stat::MaxSecondary,
        ]
    }

    /// Fundamental stats are always mutated on the base record by talents
    pub fn is_fundamental(&self) -> bool {
        matches!(
            self,
            Stat::MaxHp
                | Stat::MaxMana
                | Stat::PhysicalDamage
                | Stat::MagicalDamage
                | Stat::Armor
                | Stat::MagicalResistance
                | Stat::Speed
        )
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stat::PhysicalDamage => "physical_damage",
            Stat::MagicalDamage => "magical_damage",
            Stat::Armor => "armor",
            Stat::MagicalResistance => "magical_resistance",
            Stat::Lifesteal => "lifesteal",
            Stat::DodgeChance => "dodge_chance",
            Stat::CritChance => "crit_chance",
            Stat::CritMultiplier => "crit_multiplier",
            Stat::HealingPower => "healing_power",
            Stat::HealingReceived => "healing_received",
            Stat::DamageReduction => "damage_reduction",
            Stat::MaxHp => "max_hp",
            Stat::MaxMana => "max_mana",
            Stat::HpPerTurn => "hp_per_turn",
            Stat::ManaPerTurn => "mana_per_turn",
            Stat::Speed => "speed",
            Stat::MaxSecondary => "max_secondary",
        };
        write!(f, "{}", s)
    }
}

/// Damage types, each mitigated by a different defense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Reduced by armor
    #[default]
    Physical,
    /// Reduced by magical resistance
    Magical,
    /// Never mitigated
    True,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageType::Physical => write!(f, "Physical"),
            DamageType::Magical => write!(f, "Magical"),
            DamageType::True => write!(f, "True"),
        }
    }
}

/// How a stat modifier combines with the running value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    Add,
    Multiply,
    /// Highest value wins; an untouched base value is always overwritten
    Set,
    /// Adds a fraction of the base value
    AddBasePercentage,
}

/// Loosely typed value used by talents and bespoke character properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(v) => Some(*v),
            PropertyValue::Number(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Flag(v) => write!(f, "{}", v),
            PropertyValue::Number(v) => write!(f, "{}", v),
            PropertyValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Flag(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

// ============================================================================
// Attribute record
// ============================================================================

/// A combatant's attribute record
///
/// The same shape is used for the base record (definition + talents) and the
/// current record (derived by recalculation). Resource values (`hp`, `mana`,
/// `secondary`) only carry meaning on the current record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    // === Offense ===
    pub physical_damage: f64,
    pub magical_damage: f64,
    /// Chance in [0, 1]
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    /// Fraction of damage dealt returned as healing
    pub lifesteal: f64,
    pub healing_power: f64,

    // === Defense ===
    pub armor: f64,
    pub magical_resistance: f64,
    /// Chance in [0, 1]
    pub dodge_chance: f64,
    /// Flat fraction removed from every incoming hit
    pub damage_reduction: f64,
    /// Bonus fraction on healing received
    pub healing_received: f64,

    // === Resource pools ===
    pub max_hp: f64,
    pub max_mana: f64,
    pub hp_per_turn: f64,
    pub mana_per_turn: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_secondary: Option<f64>,

    // === Utility ===
    pub speed: f64,

    // === Current resources ===
    pub hp: f64,
    pub mana: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<f64>,
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes {
            physical_damage: 0.0,
            magical_damage: 0.0,
            crit_chance: 0.0,
            crit_multiplier: 1.5,
            lifesteal: 0.0,
            healing_power: 0.0,
            armor: 0.0,
            magical_resistance: 0.0,
            dodge_chance: 0.0,
            damage_reduction: 0.0,
            healing_received: 0.0,
            max_hp: 100.0,
            max_mana: 100.0,
            hp_per_turn: 0.0,
            mana_per_turn: 0.0,
            max_secondary: None,
            speed: 100.0,
            hp: 100.0,
            mana: 100.0,
            secondary: None,
        }
    }
}

impl Attributes {
    /// Read a stat (an undefined secondary pool reads as 0)
    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::PhysicalDamage => self.physical_damage,
            Stat::MagicalDamage => self.magical_damage,
            Stat::Armor => self.armor,
            Stat::MagicalResistance => self.magical_resistance,
            Stat::Lifesteal => self.lifesteal,
            Stat::DodgeChance => self.dodge_chance,
            Stat::CritChance => self.crit_chance,
            Stat::CritMultiplier => self.crit_multiplier,
            Stat::HealingPower => self.healing_power,
            Stat::HealingReceived => self.healing_received,
            Stat::DamageReduction => self.damage_reduction,
            Stat::MaxHp => self.max_hp,
            Stat::MaxMana => self.max_mana,
            Stat::HpPerTurn => self.hp_per_turn,
            Stat::ManaPerTurn => self.mana_per_turn,
            Stat::Speed => self.speed,
            Stat::MaxSecondary => self.max_secondary.unwrap_or(0.0),
        }
    }

    /// Write a stat
    ///
    /// Writing `MaxSecondary` on a record without a secondary pool is ignored,
    /// so modifiers never conjure a resource the character does not have.
    pub fn set(&mut self, stat: Stat, value: f64) {
        match stat {
            Stat::PhysicalDamage => self.physical_damage = value,
            Stat::MagicalDamage => self.magical_damage = value,
            Stat::Armor => self.armor = value,
            Stat::MagicalResistance => self.magical_resistance = value,
            Stat::Lifesteal => self.lifesteal = value,
            Stat::DodgeChance => self.dodge_chance = value,
            Stat::CritChance => self.crit_chance = value,
            Stat::CritMultiplier => self.crit_multiplier = value,
            Stat::HealingPower => self.healing_power = value,
            Stat::HealingReceived => self.healing_received = value,
            Stat::DamageReduction => self.damage_reduction = value,
            Stat::MaxHp => self.max_hp = value,
            Stat::MaxMana => self.max_mana = value,
            Stat::HpPerTurn => self.hp_per_turn = value,
            Stat::ManaPerTurn => self.mana_per_turn = value,
            Stat::Speed => self.speed = value,
            Stat::MaxSecondary => {
                if self.max_secondary.is_some() {
                    self.max_secondary = Some(value);
                }
            }
        }
    }

    /// Add to a stat
    pub fn add(&mut self, stat: Stat, delta: f64) {
        let value = self.get(stat) + delta;
        self.set(stat, value);
    }

    /// Whether the record defines a secondary resource pool
    pub fn has_secondary(&self) -> bool {
        self.max_secondary.is_some()
    }

    /// Missing HP (never negative)
    pub fn missing_hp(&self) -> f64 {
        (self.max_hp - self.hp).max(0.0)
    }

    /// Replace every non-finite numeric with 0 and drop a non-finite secondary pool
    pub fn sanitize(&mut self) {
        // Pool first, so the stat loop never writes 0 into a NaN max
        if self.max_secondary.is_some_and(|v| !v.is_finite()) {
            self.max_secondary = None;
            self.secondary = None;
        }
        if self.secondary.is_some_and(|v| !v.is_finite()) {
            self.secondary = Some(0.0);
        }
        for stat in Stat::all() {
            if !self.get(*stat).is_finite() {
                self.set(*stat, 0.0);
            }
        }
        if !self.hp.is_finite() {
            self.hp = 0.0;
        }
        if !self.mana.is_finite() {
            self.mana = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip_every_stat() {
        let mut attrs = Attributes {
            max_secondary: Some(10.0),
            ..Default::default()
        };
        for (i, stat) in Stat::all().iter().enumerate() {
            attrs.set(*stat, i as f64 + 0.5);
            assert!((attrs.get(*stat) - (i as f64 + 0.5)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_secondary_not_created_by_set() {
        let mut attrs = Attributes::default();
        attrs.set(Stat::MaxSecondary, 50.0);
        assert!(attrs.max_secondary.is_none());
        assert!((attrs.get(Stat::MaxSecondary) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fundamental_stats() {
        assert!(Stat::MaxHp.is_fundamental());
        assert!(Stat::Armor.is_fundamental());
        assert!(!Stat::DodgeChance.is_fundamental());
        assert!(!Stat::Lifesteal.is_fundamental());
    }

    #[test]
    fn test_sanitize_replaces_non_finite() {
        let mut attrs = Attributes {
            armor: f64::NAN,
            hp: f64::INFINITY,
            max_secondary: Some(f64::NAN),
            secondary: Some(3.0),
            ..Default::default()
        };
        attrs.sanitize();
        assert!((attrs.armor - 0.0).abs() < f64::EPSILON);
        assert!((attrs.hp - 0.0).abs() < f64::EPSILON);
        assert!(attrs.max_secondary.is_none());
        assert!(attrs.secondary.is_none());
        assert!(!attrs.has_secondary());
    }

    #[test]
    fn test_sanitize_keeps_finite_pool() {
        let mut attrs = Attributes {
            max_secondary: Some(40.0),
            secondary: Some(f64::NAN),
            ..Default::default()
        };
        attrs.sanitize();
        assert_eq!(attrs.max_secondary, Some(40.0));
        assert_eq!(attrs.secondary, Some(0.0));
    }

    #[test]
    fn test_parse_partial_attributes() {
        let toml = r#"
armor = 50
max_hp = 800
dodge_chance = 0.05
"#;
        let attrs: Attributes = toml::from_str(toml).unwrap();
        assert!((attrs.armor - 50.0).abs() < f64::EPSILON);
        assert!((attrs.max_hp - 800.0).abs() < f64::EPSILON);
        assert!((attrs.crit_multiplier - 1.5).abs() < f64::EPSILON);
        assert!(attrs.max_secondary.is_none());
    }

    #[test]
    fn test_undefined_secondary_not_serialized() {
        let json = serde_json::to_string(&Attributes::default()).unwrap();
        assert!(!json.contains("secondary"));
    }
}
