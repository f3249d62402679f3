//! Talent application - one-time, permanent changes made at battle setup
//!
//! Talents mutate the base record, ability instances, the passive descriptor
//! or character properties. They are never replayed by recalculation.

use crate::combatant::Combatant;
use defs_core::{TalentEffect, TalentTree};
use thiserror::Error;

/// Why a talent (or one of its effects) was skipped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TalentError {
    #[error("Unknown talent: {0}")]
    UnknownTalent(String),
    #[error("Talent already applied: {0}")]
    AlreadyApplied(String),
    #[error("Unknown ability '{ability}' in talent {talent}")]
    UnknownAbility { talent: String, ability: String },
    #[error("Invalid value '{value}' for property '{property}'")]
    InvalidValue { property: String, value: String },
    #[error("Talent {talent} targets passive '{expected}' but the character has {found}")]
    PassiveMismatch {
        talent: String,
        expected: String,
        found: String,
    },
    #[error("Unknown effect type in talent {0}")]
    UnknownEffectType(String),
}

/// Outcome of `apply_talents`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TalentReport {
    /// Talent ids now recorded on the combatant
    pub applied: Vec<String>,
    /// (talent id, reason) for every talent or effect that was skipped
    pub skipped: Vec<(String, TalentError)>,
}

impl TalentReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Apply the selected talents from a tree
///
/// Problems are logged and skipped; they never stop the remaining talents.
/// A talent counts as applied even if some of its effects were skipped.
pub fn apply_talents<S: AsRef<str>>(combatant: &mut Combatant, tree: &TalentTree, selected: &[S]) -> TalentReport {
    let mut report = TalentReport::default();
    let mut stats_changed = false;

    for talent_id in selected.iter().map(AsRef::as_ref) {
        let Some(talent) = tree.get(talent_id) else {
            skip(&mut report, combatant, talent_id, TalentError::UnknownTalent(talent_id.to_string()));
            continue;
        };
        if combatant.has_talent(talent_id) {
            skip(&mut report, combatant, talent_id, TalentError::AlreadyApplied(talent_id.to_string()));
            continue;
        }

        for effect in &talent.effects {
            match apply_effect(combatant, talent_id, effect) {
                Ok(changed_stats) => stats_changed |= changed_stats,
                Err(err) => skip(&mut report, combatant, talent_id, err),
            }
        }

        combatant.mark_talent_applied(talent_id);
        report.applied.push(talent_id.to_string());
        tracing::info!(combatant = %combatant.instance_id(), talent = %talent_id, "Talent applied");
    }

    if stats_changed {
        combatant.recalculate();
    }
    report
}

fn skip(report: &mut TalentReport, combatant: &Combatant, talent_id: &str, err: TalentError) {
    tracing::warn!(combatant = %combatant.instance_id(), talent = %talent_id, "Skipping talent effect: {}", err);
    report.skipped.push((talent_id.to_string(), err));
}

/// Apply one talent effect; returns true if base stats changed
fn apply_effect(combatant: &mut Combatant, talent_id: &str, effect: &TalentEffect) -> Result<bool, TalentError> {
    match effect {
        TalentEffect::ModifyStat {
            stat,
            operation,
            value,
            target,
        } => {
            let next = operation.apply(combatant.base().get(*stat), *value);
            if !next.is_finite() {
                return Err(TalentError::InvalidValue {
                    property: stat.to_string(),
                    value: value.to_string(),
                });
            }
            tracing::debug!(stat = %stat, ?target, fundamental = stat.is_fundamental(), value = next, "Base stat modified");
            combatant.base_mut().set(*stat, next);
            Ok(true)
        }
        TalentEffect::ModifyAbility {
            ability_id,
            property,
            operation,
            value,
        } => {
            let ability = combatant
                .find_ability_mut(ability_id)
                .ok_or_else(|| TalentError::UnknownAbility {
                    talent: talent_id.to_string(),
                    ability: ability_id.clone(),
                })?;
            ability.apply_modification(talent_id, property, *operation, value.clone())?;
            Ok(false)
        }
        TalentEffect::ModifyPassive {
            passive_id,
            property,
            value,
        } => {
            let passive = match combatant.passive.as_mut() {
                Some(passive) if passive.id == *passive_id => passive,
                other => {
                    return Err(TalentError::PassiveMismatch {
                        talent: talent_id.to_string(),
                        expected: passive_id.clone(),
                        found: other.map_or_else(|| "no passive".to_string(), |p| p.id.clone()),
                    })
                }
            };
            passive.properties.insert(property.clone(), value.clone());
            notify_passive_changed(combatant);
            Ok(false)
        }
        TalentEffect::ModifyCharacterProperty { property, value } => {
            combatant.properties.set(property, value.clone())?;
            Ok(property == "bonus_dodge")
        }
        TalentEffect::Unknown => Err(TalentError::UnknownEffectType(talent_id.to_string())),
    }
}

fn notify_passive_changed(combatant: &mut Combatant) {
    let Some(mut extension) = combatant.take_extension() else {
        return;
    };
    if let Some(passive) = &combatant.passive {
        if let Err(err) = extension.on_passive_changed(passive) {
            tracing::warn!(combatant = %combatant.instance_id(), "Passive refresh failed: {}", err);
        }
    }
    combatant.restore_extension(extension);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityFactory;
    use crate::combatant::Team;
    use crate::hooks::{CharacterExtension, HookError};
    use defs_core::{
        AbilityDescriptor, Attributes, CharacterDefinition, PassiveDescriptor, PropertyValue, Stat, StatOperation,
        StatTarget, TalentDefinition,
    };
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup() -> Combatant {
        let definition = CharacterDefinition::new("mage", "Mage", Attributes::default())
            .with_ability(
                AbilityDescriptor::new("bolt", "Bolt")
                    .with_effect("damage")
                    .with_cooldown(3)
                    .with_param("coefficient", 1.0),
            )
            .with_passive(PassiveDescriptor::new("arcane_flow", "Arcane Flow"));
        Combatant::from_definition(&definition, &AbilityFactory::with_builtins(), Team::Player)
    }

    fn stat_talent(id: &str, stat: Stat, operation: StatOperation, value: f64) -> TalentDefinition {
        TalentDefinition::new(id, id).with_effect(TalentEffect::ModifyStat {
            stat,
            operation,
            value,
            target: StatTarget::Base,
        })
    }

    #[test]
    fn test_stat_talents_change_base() {
        let mut mage = setup();
        let tree = TalentTree::from_definitions([
            stat_talent("vigor", Stat::MaxHp, StatOperation::Add, 50.0),
            stat_talent("focus", Stat::CritChance, StatOperation::Set, 0.25),
        ]);

        let report = apply_talents(&mut mage, &tree, &["vigor", "focus"]);

        assert!(report.is_clean());
        assert!((mage.base().max_hp - 150.0).abs() < f64::EPSILON);
        assert!((mage.max_hp() - 150.0).abs() < f64::EPSILON);
        assert!((mage.current().crit_chance - 0.25).abs() < f64::EPSILON);
        assert!(mage.has_talent("vigor"));
    }

    #[test]
    fn test_talents_never_stack_on_themselves() {
        let mut mage = setup();
        let tree = TalentTree::from_definitions([stat_talent("vigor", Stat::MaxHp, StatOperation::Add, 50.0)]);

        apply_talents(&mut mage, &tree, &["vigor"]);
        let report = apply_talents(&mut mage, &tree, &["vigor"]);
        mage.recalculate();

        assert_eq!(report.skipped, vec![("vigor".to_string(), TalentError::AlreadyApplied("vigor".to_string()))]);
        assert!((mage.max_hp() - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failures_do_not_stop_other_talents() {
        let mut mage = setup();
        let tree = TalentTree::from_definitions([
            TalentDefinition::new("broken", "Broken")
                .with_effect(TalentEffect::Unknown)
                .with_effect(TalentEffect::ModifyAbility {
                    ability_id: "meteor".to_string(),
                    property: "cooldown".to_string(),
                    operation: None,
                    value: PropertyValue::Number(1.0),
                }),
            TalentDefinition::new("quick", "Quick").with_effect(TalentEffect::ModifyAbility {
                ability_id: "bolt".to_string(),
                property: "cooldown".to_string(),
                operation: Some(StatOperation::Subtract),
                value: PropertyValue::Number(1.0),
            }),
        ]);

        let report = apply_talents(&mut mage, &tree, &["missing", "broken", "quick"]);

        assert_eq!(report.applied, vec!["broken".to_string(), "quick".to_string()]);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(mage.find_ability("bolt").unwrap().cooldown, 2);
        assert_eq!(mage.find_ability("bolt").unwrap().modifications().len(), 1);
    }

    #[derive(Default)]
    struct Listener {
        refreshed: Rc<Cell<u32>>,
    }

    impl CharacterExtension for Listener {
        fn on_passive_changed(&mut self, passive: &PassiveDescriptor) -> Result<(), HookError> {
            if passive.number("potency").is_some() {
                self.refreshed.set(self.refreshed.get() + 1);
            }
            Ok(())
        }
    }

    #[test]
    fn test_passive_and_property_talents() {
        let refreshed = Rc::new(Cell::new(0));
        let mut mage = setup().with_extension(Listener {
            refreshed: refreshed.clone(),
        });
        let tree = TalentTree::from_definitions([
            TalentDefinition::new("attuned", "Attuned").with_effect(TalentEffect::ModifyPassive {
                passive_id: "arcane_flow".to_string(),
                property: "potency".to_string(),
                value: PropertyValue::Number(2.0),
            }),
            TalentDefinition::new("wrong", "Wrong").with_effect(TalentEffect::ModifyPassive {
                passive_id: "rage".to_string(),
                property: "potency".to_string(),
                value: PropertyValue::Number(2.0),
            }),
            TalentDefinition::new("nimble", "Nimble").with_effect(TalentEffect::ModifyCharacterProperty {
                property: "bonus_dodge".to_string(),
                value: PropertyValue::Number(0.1),
            }),
        ]);

        let report = apply_talents(&mut mage, &tree, &["attuned", "wrong", "nimble"]);

        assert_eq!(refreshed.get(), 1);
        assert!(mage.has_extension());
        assert!(matches!(report.skipped[0].1, TalentError::PassiveMismatch { .. }));
        assert!((mage.current().dodge_chance - 0.1).abs() < 1e-9);
    }
}
