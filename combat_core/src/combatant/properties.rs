//! Named per-character properties set by talents

use crate::talent::TalentError;
use defs_core::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Small bespoke toggles that do not fit the stat model
///
/// Names the pipeline understands map to typed fields; anything else is kept
/// in `extra` for character extensions to read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterProperties {
    /// Outgoing damage bonus per debuff on the target (0.05 = +5% each)
    pub bonus_damage_per_debuff: f64,
    /// Outgoing damage bonus against `favored_faction`
    pub faction_damage_bonus: f64,
    pub favored_faction: Option<String>,
    /// Mana restored to the healer on each direct heal
    pub mana_on_heal: f64,
    /// Fraction of max HP regenerated per turn
    pub percent_hp_regen: f64,
    /// Fraction of max mana regenerated per turn
    pub percent_mana_regen: f64,
    /// Fraction of missing HP regenerated per turn
    pub missing_hp_regen: f64,
    /// Chance at turn start to strip every debuff
    pub cleanse_chance: f64,
    /// Shield granted per active buff, recomputed each turn
    pub shield_per_buff: f64,
    /// Chance an ability's cooldown resets after use
    pub cooldown_reset_chance: f64,
    /// Flat dodge chance accumulated outside the effect list
    pub bonus_dodge: f64,
    pub extra: BTreeMap<String, PropertyValue>,
}

impl CharacterProperties {
    /// Set a property by name
    pub fn set(&mut self, name: &str, value: PropertyValue) -> Result<(), TalentError> {
        let number = |value: &PropertyValue| {
            value.as_f64().ok_or_else(|| TalentError::InvalidValue {
                property: name.to_string(),
                value: value.to_string(),
            })
        };

        match name {
            "bonus_damage_per_debuff" => self.bonus_damage_per_debuff = number(&value)?,
            "faction_damage_bonus" => self.faction_damage_bonus = number(&value)?,
            "mana_on_heal" => self.mana_on_heal = number(&value)?,
            "percent_hp_regen" => self.percent_hp_regen = number(&value)?,
            "percent_mana_regen" => self.percent_mana_regen = number(&value)?,
            "missing_hp_regen" => self.missing_hp_regen = number(&value)?,
            "cleanse_chance" => self.cleanse_chance = number(&value)?,
            "shield_per_buff" => self.shield_per_buff = number(&value)?,
            "cooldown_reset_chance" => self.cooldown_reset_chance = number(&value)?,
            "bonus_dodge" => self.bonus_dodge = number(&value)?,
            "favored_faction" => match value {
                PropertyValue::Text(faction) => self.favored_faction = Some(faction),
                other => {
                    return Err(TalentError::InvalidValue {
                        property: name.to_string(),
                        value: other.to_string(),
                    })
                }
            },
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    /// Read a property by name
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "bonus_damage_per_debuff" => self.bonus_damage_per_debuff,
            "faction_damage_bonus" => self.faction_damage_bonus,
            "mana_on_heal" => self.mana_on_heal,
            "percent_hp_regen" => self.percent_hp_regen,
            "percent_mana_regen" => self.percent_mana_regen,
            "missing_hp_regen" => self.missing_hp_regen,
            "cleanse_chance" => self.cleanse_chance,
            "shield_per_buff" => self.shield_per_buff,
            "cooldown_reset_chance" => self.cooldown_reset_chance,
            "bonus_dodge" => self.bonus_dodge,
            "favored_faction" => {
                return self.favored_faction.as_deref().map(PropertyValue::from);
            }
            _ => return self.extra.get(name).cloned(),
        };
        Some(PropertyValue::Number(value))
    }

    /// Numeric value of a free-form property
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).as_ref().and_then(PropertyValue::as_f64)
    }

    /// Boolean value of a free-form property (missing reads as false)
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).as_ref().and_then(PropertyValue::as_bool).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_properties_are_typed() {
        let mut props = CharacterProperties::default();
        props.set("cleanse_chance", PropertyValue::Number(0.25)).unwrap();
        props.set("favored_faction", PropertyValue::from("undead")).unwrap();

        assert!((props.cleanse_chance - 0.25).abs() < f64::EPSILON);
        assert_eq!(props.favored_faction.as_deref(), Some("undead"));
        assert!(props.extra.is_empty());
    }

    #[test]
    fn test_unknown_properties_land_in_extra() {
        let mut props = CharacterProperties::default();
        props.set("echoing_strikes", PropertyValue::Flag(true)).unwrap();
        assert!(props.flag("echoing_strikes"));
        assert!(!props.flag("missing"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut props = CharacterProperties::default();
        let err = props.set("mana_on_heal", PropertyValue::from("lots")).unwrap_err();
        assert!(matches!(err, TalentError::InvalidValue { .. }));
        assert!((props.mana_on_heal - 0.0).abs() < f64::EPSILON);
    }
}
